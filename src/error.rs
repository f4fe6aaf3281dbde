//! Error taxonomy for the board analyzer
//!
//! Every failure a user can see rolls up into [`AppError`]. Module-level errors
//! (`FetchError`, `ConfigError`, ...) convert into it with `?`.

use crate::config::ConfigError;
use crate::credentials::CredentialStoreError;
use crate::trello::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum length of a user-facing error message
const MAX_MESSAGE_LEN: usize = 500;

/// Main error type for board analysis operations
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing credentials: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("Failed to fetch Trello data: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("Pipeline failed: {message}")]
    PipelineFailed { message: String },

    #[error("An analysis run is already in progress")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential store error: {0}")]
    CredentialStore(#[from] CredentialStoreError),
}

impl AppError {
    /// Create missing credentials error
    pub fn missing_credentials(missing: Vec<&'static str>) -> Self {
        Self::MissingCredentials { missing }
    }

    /// Create pipeline failure
    pub fn pipeline_failed<S: Into<String>>(message: S) -> Self {
        Self::PipelineFailed {
            message: message.into(),
        }
    }

    /// Message safe to show on the terminal
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

impl From<crate::llm::LlmError> for AppError {
    fn from(error: crate::llm::LlmError) -> Self {
        Self::pipeline_failed(error.to_string())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)(=|:\s*)[^\s&]+").expect("valid secret regex")
});

static BEARER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("valid bearer regex"));

/// Mask credentials that leak into error text.
///
/// Trello credentials travel in the query string, so transport errors that
/// echo the request URL would otherwise print them.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();
    sanitized = BEARER_PATTERN
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for analyzer operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_lists_fields() {
        let error = AppError::missing_credentials(vec!["api_key", "board_id"]);
        assert_eq!(error.to_string(), "Missing credentials: api_key, board_id");
    }

    #[test]
    fn test_pipeline_failed_constructor() {
        let error = AppError::pipeline_failed("model timeout");
        assert!(matches!(error, AppError::PipelineFailed { .. }));
        assert_eq!(error.to_string(), "Pipeline failed: model timeout");
    }

    #[test]
    fn test_fetch_error_converts() {
        let error: AppError = FetchError::Status {
            status: 401,
            body: "invalid key".to_string(),
        }
        .into();
        assert!(matches!(error, AppError::FetchFailed(_)));
        assert!(error.to_string().contains("401"));
    }

    #[test]
    fn test_llm_error_becomes_pipeline_failure() {
        let error: AppError =
            crate::llm::LlmError::AuthenticationFailed("bad key".to_string()).into();
        assert!(matches!(error, AppError::PipelineFailed { .. }));
    }

    #[test]
    fn test_query_string_credentials_are_masked() {
        let message = "error sending request for url (https://api.trello.com/1/boards/abc/cards?key=k123&token=t456&fields=name)";
        let sanitized = sanitize_error_message(message);

        assert!(!sanitized.contains("k123"));
        assert!(!sanitized.contains("t456"));
        assert!(sanitized.contains("key=***"));
        assert!(sanitized.contains("token=***"));
        assert!(sanitized.contains("fields=name"));
    }

    #[test]
    fn test_bearer_token_is_masked() {
        let sanitized = sanitize_error_message("Authorization: Bearer sk-abcdef");
        assert!(!sanitized.contains("sk-abcdef"));
    }

    #[test]
    fn test_sanitize_with_colons() {
        let sanitized = sanitize_error_message("password: secret123 token: abc456");
        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc456"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= MAX_MESSAGE_LEN);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.len() <= MAX_MESSAGE_LEN);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_exactly_max_chars() {
        let sanitized = sanitize_error_message(&"x".repeat(MAX_MESSAGE_LEN));
        assert_eq!(sanitized.len(), MAX_MESSAGE_LEN);
        assert!(!sanitized.contains("truncated"));
    }

    #[test]
    fn test_user_message_is_sanitized() {
        let error = AppError::pipeline_failed("OpenAI rejected api_key=sk-live-1");
        assert!(!error.user_message().contains("sk-live-1"));
    }
}
