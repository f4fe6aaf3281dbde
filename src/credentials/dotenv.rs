//! Dotfile credential store
//!
//! Reads and writes `KEY=VALUE` lines. Saving rewrites only the keys it owns;
//! comments, blank lines and unrelated variables survive untouched.

use super::{CredentialStore, CredentialStoreError, Credentials};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Credential store backed by a `.env` style file
#[derive(Debug, Clone)]
pub struct DotenvStore {
    path: PathBuf,
}

impl DotenvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all variables; a missing file is treated as empty
    pub fn read_vars(&self) -> Result<HashMap<String, String>, CredentialStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_dotenv(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(CredentialStoreError::Read {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Set one variable, preserving the rest of the file
    pub fn set_var(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        self.set_vars(&[(key, value)])
    }

    fn set_vars(&self, pairs: &[(&str, &str)]) -> Result<(), CredentialStoreError> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(CredentialStoreError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let updated = update_dotenv(&existing, pairs);
        std::fs::write(&self.path, updated).map_err(|source| CredentialStoreError::Write {
            path: self.path.display().to_string(),
            source,
        })?;

        debug!(path = %self.path.display(), keys = pairs.len(), "Updated dotfile");
        Ok(())
    }
}

impl CredentialStore for DotenvStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Credentials, CredentialStoreError> {
        let vars = self.read_vars()?;
        Ok(Credentials::from_lookup(|name| vars.get(name).cloned()))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError> {
        let pairs: Vec<(&str, &str)> = credentials
            .to_pairs()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();

        if pairs.is_empty() {
            return Ok(());
        }
        self.set_vars(&pairs)
    }
}

/// Split a line into key and raw value, ignoring comments and `export`
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Parse dotfile content into variables (pure function)
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(split_assignment)
        .map(|(key, value)| (key.to_string(), unquote(value)))
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            return if quote == '"' {
                unescape(inner)
            } else {
                inner.to_string()
            };
        }
    }

    // Unquoted values may carry a trailing comment
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

fn unescape(inner: &str) -> String {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
                continue;
            }
        }
        result.push(c);
    }
    result
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || c == '#' || c == '"' || c == '\'' || c == '\\');
    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Apply assignments to dotfile content (pure function)
///
/// Existing keys are rewritten in place, new keys are appended in order.
pub fn update_dotenv(content: &str, pairs: &[(&str, &str)]) -> String {
    let mut pending: Vec<(&str, &str)> = pairs.to_vec();
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| match split_assignment(line) {
            Some((key, _)) => match pending.iter().position(|(k, _)| *k == key) {
                Some(idx) => {
                    let (k, v) = pending.remove(idx);
                    format!("{k}={}", quote_if_needed(v))
                }
                None => line.to_string(),
            },
            None => line.to_string(),
        })
        .collect();

    lines.extend(
        pending
            .into_iter()
            .map(|(k, v)| format!("{k}={}", quote_if_needed(v))),
    );

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
