//! Trello board data fetcher tool
//!
//! Wraps a [`BoardFetcher`] so the data collection agent can pull the board
//! through function calling. Credentials are bound at construction.

use crate::tools::{Tool, ToolDescription, ToolError};
use crate::trello::BoardFetcher;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Name the LLM uses to call this tool
pub const BOARD_FETCHER_TOOL_NAME: &str = "trello_board_data_fetcher";

/// Fetches card data, comments and activity from one Trello board
pub struct BoardDataFetcherTool {
    fetcher: Arc<dyn BoardFetcher>,
    board_id: String,
    api_key: String,
    token: String,
}

impl BoardDataFetcherTool {
    pub fn new(
        fetcher: Arc<dyn BoardFetcher>,
        board_id: impl Into<String>,
        api_key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            board_id: board_id.into(),
            api_key: api_key.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Tool for BoardDataFetcherTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: BOARD_FETCHER_TOOL_NAME.to_string(),
            description: "Fetches card data, comments, and activity from a Trello board."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        let snapshot = self
            .fetcher
            .fetch(&self.board_id, &self.api_key, &self.token)
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to fetch Trello data: {e}")))?;

        info!(
            board_id = %self.board_id,
            cards = snapshot.len(),
            "Board data fetched for agent"
        );
        Ok(snapshot.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBoardFetcher;
    use crate::trello::{BoardSnapshot, FetchError};

    #[test]
    fn test_tool_description() {
        let tool = BoardDataFetcherTool::new(Arc::new(MockBoardFetcher::empty()), "b", "k", "t");
        let description = tool.describe();

        assert_eq!(description.name, BOARD_FETCHER_TOOL_NAME);
        assert!(!description.description.is_empty());
        assert_eq!(description.parameters["type"], "object");
    }

    #[tokio::test]
    async fn test_execute_passes_bound_credentials() {
        let fetcher = Arc::new(MockBoardFetcher::with_snapshot(BoardSnapshot::new(vec![
            json!({"name": "a"}),
            json!({"name": "b"}),
        ])));
        let tool = BoardDataFetcherTool::new(fetcher.clone(), "board-1", "key-1", "token-1");

        let result = tool.execute(&json!({})).await.unwrap();

        assert_eq!(result.as_array().map(Vec::len), Some(2));
        let calls = fetcher.calls().await;
        assert_eq!(
            calls,
            vec![(
                "board-1".to_string(),
                "key-1".to_string(),
                "token-1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_tool_error() {
        let fetcher = Arc::new(MockBoardFetcher::with_error(FetchError::Status {
            status: 401,
            body: "invalid token".to_string(),
        }));
        let tool = BoardDataFetcherTool::new(fetcher, "b", "k", "t");

        let result = tool.execute(&json!({})).await;
        match result {
            Err(ToolError::ExecutionError(msg)) => assert!(msg.contains("401")),
            other => panic!("expected execution error, got {other:?}"),
        }
    }
}
