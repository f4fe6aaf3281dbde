//! Mock implementations for testing
//!
//! Provides mock LlmProvider, BoardFetcher and AnalysisStages implementations
//! so the pipeline can be exercised without Trello or an LLM endpoint.

use crate::crew::{AnalysisStages, BoardContext, TaskOutput, UsageMetrics};
use crate::error::{AppError, AppResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::trello::{BoardFetcher, BoardSnapshot, FetchError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Token usage reported by every mock completion
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

/// One scripted LLM reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Error(LlmError),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Request a single tool call with the given arguments
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCalls(vec![ToolCall {
            id: "call_mock".to_string(),
            name: name.into(),
            arguments,
        }])
    }
}

/// Mock LLM provider for testing
///
/// Replies are served in order and cycle once exhausted. Every request is
/// recorded for later inspection.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub replies: Vec<MockReply>,
    pub current_reply: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_replies(responses.into_iter().map(MockReply::Text).collect())
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let reply = {
            let mut current = self.current_reply.lock().await;
            let index = *current % self.replies.len().max(1);
            *current += 1;
            self.replies
                .get(index)
                .cloned()
                .unwrap_or_else(|| MockReply::text("Mock response"))
        };

        match reply {
            MockReply::Text(content) => Ok(CompletionResponse {
                content: Some(content),
                model: "mock-model".to_string(),
                usage: MOCK_USAGE,
                finish_reason: FinishReason::Stop,
                tool_calls: None,
            }),
            MockReply::ToolCalls(calls) => Ok(CompletionResponse {
                content: None,
                model: "mock-model".to_string(),
                usage: MOCK_USAGE,
                finish_reason: FinishReason::ToolCalls,
                tool_calls: Some(calls),
            }),
            MockReply::Error(error) => Err(error),
        }
    }
}

/// Mock board fetcher returning a fixed result
#[derive(Debug)]
pub struct MockBoardFetcher {
    result: Result<BoardSnapshot, FetchError>,
    calls: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockBoardFetcher {
    pub fn with_snapshot(snapshot: BoardSnapshot) -> Self {
        Self {
            result: Ok(snapshot),
            calls: Arc::default(),
        }
    }

    pub fn with_error(error: FetchError) -> Self {
        Self {
            result: Err(error),
            calls: Arc::default(),
        }
    }

    pub fn empty() -> Self {
        Self::with_snapshot(BoardSnapshot::default())
    }

    /// `(board_id, api_key, token)` of every fetch so far
    pub async fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl BoardFetcher for MockBoardFetcher {
    async fn fetch(
        &self,
        board_id: &str,
        api_key: &str,
        token: &str,
    ) -> Result<BoardSnapshot, FetchError> {
        self.calls.lock().await.push((
            board_id.to_string(),
            api_key.to_string(),
            token.to_string(),
        ));
        self.result.clone()
    }
}

/// Stages that record their invocation order and the context each received
#[derive(Debug, Default)]
pub struct RecordingStages {
    /// `(stage, context text)` in call order
    pub invocations: Arc<Mutex<Vec<(String, Option<String>)>>>,
    /// Stage name that should fail, if any
    pub fail_at: Option<&'static str>,
}

impl RecordingStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: &'static str) -> Self {
        Self {
            fail_at: Some(stage),
            ..Default::default()
        }
    }

    pub async fn stage_names(&self) -> Vec<String> {
        self.invocations
            .lock()
            .await
            .iter()
            .map(|(stage, _)| stage.clone())
            .collect()
    }

    async fn record(&self, stage: &'static str, context: &BoardContext) -> AppResult<TaskOutput> {
        self.invocations
            .lock()
            .await
            .push((stage.to_string(), context.context_text()));

        if self.fail_at == Some(stage) {
            return Err(AppError::pipeline_failed(format!("{stage} failed")));
        }

        Ok(TaskOutput {
            task: stage.to_string(),
            agent_role: "Recorder".to_string(),
            raw: format!("{stage} output for {}", context.board_id),
            usage: UsageMetrics {
                total_tokens: u64::from(MOCK_USAGE.total_tokens),
                prompt_tokens: u64::from(MOCK_USAGE.prompt_tokens),
                completion_tokens: u64::from(MOCK_USAGE.completion_tokens),
                successful_requests: 1,
            },
        })
    }
}

#[async_trait]
impl AnalysisStages for RecordingStages {
    async fn collect(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.record("collect", context).await
    }

    async fn analyze(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.record("analyze", context).await
    }

    async fn report(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.record("report", context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hi")],
            model: "mock-model".to_string(),
            max_tokens: None,
            temperature: None,
            tools: None,
        }
    }

    #[tokio::test]
    async fn test_mock_llm_cycles_replies() {
        let llm = MockLlmProvider::new(vec!["one".to_string(), "two".to_string()]);

        let first = llm.complete(request()).await.unwrap();
        let second = llm.complete(request()).await.unwrap();
        let third = llm.complete(request()).await.unwrap();

        assert_eq!(first.content.as_deref(), Some("one"));
        assert_eq!(second.content.as_deref(), Some("two"));
        assert_eq!(third.content.as_deref(), Some("one"));
        assert_eq!(llm.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_mock_llm_tool_call_reply() {
        let llm = MockLlmProvider::with_replies(vec![MockReply::tool_call("echo", json!({}))]);
        let response = llm.complete(request()).await.unwrap();
        assert!(response.wants_tools());
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    }

    #[tokio::test]
    async fn test_mock_llm_failure() {
        let llm = MockLlmProvider::with_failure();
        assert!(llm.complete(request()).await.is_err());
        assert_eq!(llm.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_fetcher_records_calls() {
        let fetcher = MockBoardFetcher::empty();
        fetcher.fetch("b", "k", "t").await.unwrap();
        assert_eq!(fetcher.call_count().await, 1);
    }
}
