//! OpenAI provider implementation
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, TokenUsage, ToolCall as ProviderToolCall,
};
use crate::tools::ToolDescription;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delays before each retry of a retryable failure
const BACKOFF_DELAYS_MS: [u64; 3] = [100, 200, 300];

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Convert completion request to OpenAI format (pure function)
    fn convert_request(request: &CompletionRequest) -> OpenAiCompletionRequest {
        OpenAiCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request
                .tools
                .as_ref()
                .filter(|tools| !tools.is_empty())
                .map(|tools| tools.iter().map(Self::convert_tool).collect()),
        }
    }

    /// Convert internal message to OpenAI format (pure function)
    fn convert_message(message: &Message) -> OpenAiMessage {
        OpenAiMessage {
            role: match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
        }
    }

    /// Convert tool description to OpenAI tool format (pure function)
    fn convert_tool(tool: &ToolDescription) -> OpenAiTool {
        OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    /// Parse OpenAI completion response (pure function)
    fn parse_completion_response(
        response: OpenAiCompletionResponse,
    ) -> Result<CompletionResponse, LlmError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from OpenAI".to_string())
        })?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            usage,
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
            tool_calls: choice
                .message
                .tool_calls
                .as_deref()
                .map(Self::extract_tool_calls),
        })
    }

    /// Extract tool calls from OpenAI format (pure function)
    ///
    /// Unparseable arguments are kept as a JSON string so the call still
    /// reaches the tool system, which rejects it back to the model.
    fn extract_tool_calls(calls: &[OpenAiToolCall]) -> Vec<ProviderToolCall> {
        calls
            .iter()
            .map(|call| {
                // Models send "" for tools without parameters
                let raw = if call.function.arguments.trim().is_empty() {
                    "{}"
                } else {
                    call.function.arguments.as_str()
                };
                let arguments = serde_json::from_str::<serde_json::Value>(raw).unwrap_or_else(|e| {
                    warn!(tool = %call.function.name, "Failed to parse tool call arguments: {}", e);
                    serde_json::Value::String(raw.to_string())
                });
                ProviderToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments,
                }
            })
            .collect()
    }

    /// Convert OpenAI finish reason to internal format (pure function)
    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    /// Map an HTTP error status to a provider error (pure function)
    fn classify_status(status: StatusCode, body: &str) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("OpenAI API error: {status} - {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("OpenAI API error: {status} - {body}"))
            }
            s if s.is_server_error() => {
                LlmError::ApiError(format!("OpenAI API server error: {status} - {body}"))
            }
            _ => LlmError::ApiError(format!("OpenAI API error: {status} - {body}")),
        }
    }

    /// Check if error should trigger retry (pure)
    fn should_retry(error: &LlmError) -> bool {
        match error {
            LlmError::NetworkError(_) => true,
            LlmError::ApiError(msg) => msg.contains("server error"),
            _ => false,
        }
    }

    /// Retry orchestrator - handles only I/O and retry logic
    async fn complete_with_retry(
        &self,
        request: &OpenAiCompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(BACKOFF_DELAYS_MS.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!("OpenAI retry attempt {} after {}ms delay", attempt, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.make_api_request(request).await {
                Ok(response) => return Self::parse_completion_response(response),
                Err(e) if Self::should_retry(&e) => {
                    warn!("OpenAI request attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Non-retryable OpenAI error, aborting: {}", e);
                    return Err(e);
                }
            }
        }

        error!("OpenAI request failed after all retries");
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    /// Make single API request (I/O)
    async fn make_api_request(
        &self,
        request: &OpenAiCompletionRequest,
    ) -> Result<OpenAiCompletionResponse, LlmError> {
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                LlmError::NetworkError(format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if error_text.contains("maximum context length") {
                warn!("Token limit exceeded - board data may be too large for the model");
            }
            return Err(Self::classify_status(status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let openai_request = Self::convert_request(&request);
        debug!(
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "OpenAI request"
        );

        let response = self.complete_with_retry(&openai_request).await?;
        debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            finish_reason = ?response.finish_reason,
            "OpenAI response"
        );
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_openai_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_provider_requires_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(provider().name(), "openai");
    }

    #[test]
    fn test_finish_reason_conversion() {
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("stop")),
            FinishReason::Stop
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("tool_calls")),
            FinishReason::ToolCalls
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("length")),
            FinishReason::Length
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(None),
            FinishReason::Error
        );
    }

    #[test]
    fn test_empty_tool_arguments_parse_as_object() {
        let calls = vec![OpenAiToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: OpenAiFunctionCall {
                name: "trello_board_data_fetcher".to_string(),
                arguments: String::new(),
            },
        }];

        let extracted = OpenAiProvider::extract_tool_calls(&calls);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].arguments, json!({}));
    }

    #[test]
    fn test_malformed_tool_arguments_are_kept_as_raw_text() {
        let calls = vec![OpenAiToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: OpenAiFunctionCall {
                name: "broken".to_string(),
                arguments: "{not json".to_string(),
            },
        }];
        let extracted = OpenAiProvider::extract_tool_calls(&calls);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].name, "broken");
        assert_eq!(extracted[0].arguments, json!("{not json"));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimitExceeded(_)
        ));
        let server = OpenAiProvider::classify_status(StatusCode::BAD_GATEWAY, "");
        assert!(OpenAiProvider::should_retry(&server));
        let client = OpenAiProvider::classify_status(StatusCode::BAD_REQUEST, "");
        assert!(!OpenAiProvider::should_retry(&client));
    }

    #[test]
    fn test_request_serialization_omits_empty_fields() {
        let request = CompletionRequest {
            messages: vec![Message::user("Hello")],
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            temperature: Some(0.7),
            tools: Some(vec![]),
        };

        let json = serde_json::to_string(&OpenAiProvider::convert_request(&request)).unwrap();
        assert!(json.contains("\"model\":\"gpt-4o-mini\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("tools"));
    }

    #[test]
    fn test_tool_conversion() {
        let tool = ToolDescription {
            name: "trello_board_data_fetcher".to_string(),
            description: "Fetch cards".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let converted = OpenAiProvider::convert_tool(&tool);
        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "trello_board_data_fetcher");
    }
}
