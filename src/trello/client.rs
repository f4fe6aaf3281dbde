//! Trello REST client
//!
//! One GET per fetch. Non-success responses keep their status and a trimmed
//! body so the caller can tell a bad token from a missing board.

use super::{BoardFetcher, BoardSnapshot, FetchError, CARD_FIELDS};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest response body kept in a [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 500;

/// Trello client configuration
#[derive(Debug, Clone)]
pub struct TrelloClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TrelloClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.trello.com/1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Board fetcher backed by the Trello REST API
pub struct TrelloClient {
    config: TrelloClientConfig,
    client: Client,
}

impl TrelloClient {
    pub fn new(config: TrelloClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build the cards endpoint for a board (pure function)
    pub fn cards_url(base_url: &str, board_id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidResponse(format!("invalid base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidResponse("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("boards")
            .push(board_id)
            .push("cards");

        Ok(url)
    }

    /// Query parameters for the cards request (pure function)
    fn card_query<'a>(api_key: &'a str, token: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("key", api_key),
            ("token", token),
            ("fields", CARD_FIELDS),
            ("attachments", "true"),
            ("actions", "commentCard"),
        ]
    }

    /// Parse a success body into a snapshot (pure function)
    fn parse_cards(body: Value) -> Result<BoardSnapshot, FetchError> {
        match body {
            Value::Array(cards) => Ok(BoardSnapshot::new(cards)),
            other => Err(FetchError::InvalidResponse(format!(
                "expected a JSON array of cards, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

#[async_trait]
impl BoardFetcher for TrelloClient {
    async fn fetch(
        &self,
        board_id: &str,
        api_key: &str,
        token: &str,
    ) -> Result<BoardSnapshot, FetchError> {
        let url = Self::cards_url(&self.config.base_url, board_id)?;
        debug!(board_id = %board_id, "Fetching Trello cards");

        let response = self
            .client
            .get(url)
            .query(&Self::card_query(api_key, token))
            .send()
            .await
            .map_err(|e| {
                // reqwest errors echo the URL, which carries key and token
                FetchError::Network(e.without_url().to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Trello API rejected the request");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(body.trim()),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.without_url().to_string()))?;

        let snapshot = Self::parse_cards(body)?;
        debug!(cards = snapshot.len(), "Fetched Trello cards");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = TrelloClientConfig::default();
        assert_eq!(config.base_url, "https://api.trello.com/1");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_cards_url() {
        let url = TrelloClient::cards_url("https://api.trello.com/1", "abc123").unwrap();
        assert_eq!(url.as_str(), "https://api.trello.com/1/boards/abc123/cards");
    }

    #[test]
    fn test_cards_url_with_trailing_slash() {
        let url = TrelloClient::cards_url("http://127.0.0.1:8080/", "abc").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/boards/abc/cards");
    }

    #[test]
    fn test_cards_url_encodes_board_id() {
        let url = TrelloClient::cards_url("https://api.trello.com/1", "a/b c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.trello.com/1/boards/a%2Fb%20c/cards"
        );
    }

    #[test]
    fn test_card_query_matches_trello_contract() {
        let query = TrelloClient::card_query("k", "t");
        assert_eq!(query[0], ("key", "k"));
        assert_eq!(query[1], ("token", "t"));
        assert_eq!(query[2], ("fields", "name,idList,due,dateLastActivity,labels"));
        assert_eq!(query[3], ("attachments", "true"));
        assert_eq!(query[4], ("actions", "commentCard"));
    }

    #[test]
    fn test_parse_cards_rejects_objects() {
        let result = TrelloClient::parse_cards(json!({"error": "nope"}));
        assert!(matches!(result, Err(FetchError::InvalidResponse(msg)) if msg.contains("an object")));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "y".repeat(MAX_ERROR_BODY + 50);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
    }
}
