//! Credentials and the stores they are read from
//!
//! Credentials are passed explicitly to the fetcher and the LLM provider.
//! Process environment is only ever read, through [`EnvCredentialStore`].

pub mod dotenv;

pub use dotenv::DotenvStore;

use crate::error::{AppError, AppResult};
use std::fmt;
use thiserror::Error;

/// Environment variable holding the Trello API key
pub const TRELLO_API_KEY_VAR: &str = "TRELLO_API_KEY";
/// Environment variable holding the Trello token
pub const TRELLO_API_TOKEN_VAR: &str = "TRELLO_API_TOKEN";
/// Environment variable holding the Trello board id
pub const TRELLO_BOARD_ID_VAR: &str = "TRELLO_BOARD_ID";
/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// User-supplied credentials. Empty strings mean "not provided".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub token: String,
    pub board_id: String,
    pub llm_api_key: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        token: impl Into<String>,
        board_id: impl Into<String>,
        llm_api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            token: token.into(),
            board_id: board_id.into(),
            llm_api_key: llm_api_key.into(),
        }
    }

    /// Fill every empty field from `fallback`
    pub fn or(self, fallback: Credentials) -> Credentials {
        fn pick(primary: String, fallback: String) -> String {
            if primary.trim().is_empty() {
                fallback
            } else {
                primary
            }
        }

        Credentials {
            api_key: pick(self.api_key, fallback.api_key),
            token: pick(self.token, fallback.token),
            board_id: pick(self.board_id, fallback.board_id),
            llm_api_key: pick(self.llm_api_key, fallback.llm_api_key),
        }
    }

    /// Names of the Trello fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("api_key", &self.api_key),
            ("token", &self.token),
            ("board_id", &self.board_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Require board id, API key and token before any network call
    pub fn validate(&self) -> AppResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::missing_credentials(missing))
        }
    }

    /// Key/value pairs in the environment variable naming used on disk
    pub fn to_pairs(&self) -> [(&'static str, &str); 4] {
        [
            (TRELLO_API_KEY_VAR, self.api_key.as_str()),
            (TRELLO_API_TOKEN_VAR, self.token.as_str()),
            (TRELLO_BOARD_ID_VAR, self.board_id.as_str()),
            (OPENAI_API_KEY_VAR, self.llm_api_key.as_str()),
        ]
    }

    /// Build credentials from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).unwrap_or_default();
        Credentials {
            api_key: get(TRELLO_API_KEY_VAR),
            token: get(TRELLO_API_TOKEN_VAR),
            board_id: get(TRELLO_BOARD_ID_VAR),
            llm_api_key: get(OPENAI_API_KEY_VAR),
        }
    }
}

/// Mask a secret for display, keeping the last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "<not set>".to_string(),
        len if len <= 4 => "*".repeat(len),
        len => {
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}{}", "*".repeat(len.min(12) - 4), tail)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask_secret(&self.api_key))
            .field("token", &mask_secret(&self.token))
            .field("board_id", &self.board_id)
            .field("llm_api_key", &mask_secret(&self.llm_api_key))
            .finish()
    }
}

/// Read/write access to persisted credentials
pub trait CredentialStore {
    /// Human-readable location for log messages
    fn describe(&self) -> String;

    fn load(&self) -> Result<Credentials, CredentialStoreError>;

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError>;
}

/// Read-only store over environment variables
pub struct EnvCredentialStore {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvCredentialStore {
    /// Store backed by the process environment
    pub fn process() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Store backed by an arbitrary lookup (used by tests)
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl CredentialStore for EnvCredentialStore {
    fn describe(&self) -> String {
        "environment".to_string()
    }

    fn load(&self) -> Result<Credentials, CredentialStoreError> {
        Ok(Credentials::from_lookup(|name| (self.lookup)(name)))
    }

    fn save(&self, _credentials: &Credentials) -> Result<(), CredentialStoreError> {
        Err(CredentialStoreError::ReadOnly(self.describe()))
    }
}

/// Credential store errors
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Credential store '{0}' is read-only")]
    ReadOnly(String),
}
