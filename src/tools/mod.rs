//! Tool system for crew agents
//!
//! A tool is a capability an agent may invoke through the LLM's function
//! calling. Parameters are validated against the tool's JSON schema before
//! execution.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod builtin;

pub use builtin::BoardDataFetcherTool;

/// Agent capability invoked by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON Schema of the parameters
    fn describe(&self) -> ToolDescription;

    /// Run the tool with parameters matching the schema from `describe()`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool description handed to the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of the tools one agent may use
#[derive(Clone, Default)]
pub struct ToolSystem {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under the name it describes itself with
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.describe().name;
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Descriptions of every registered tool, sorted by name
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools.values().map(|tool| tool.describe()).collect()
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        // Tool parameters are always a JSON object
        if !parameters.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "expected a JSON object, got {parameters}"
            )));
        }

        Self::validate_parameters(&tool.describe(), parameters)?;

        tool.execute(parameters).await
    }

    /// Validate parameters against tool schema
    fn validate_parameters(
        description: &ToolDescription,
        parameters: &Value,
    ) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Get list of available tools
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo the message".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"],
                    "additionalProperties": false
                }),
            }
        }

        async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
            Ok(parameters["message"].clone())
        }
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert!(tool_system.is_empty());
        assert!(tool_system.descriptions().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool)).unwrap();

        assert_eq!(tool_system.list_tools(), vec!["echo".to_string()]);
        let result = tool_system
            .execute_tool("echo", &json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, json!("hi"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool)).unwrap();
        let result = tool_system.register(Arc::new(EchoTool));
        assert!(matches!(result, Err(ToolError::DuplicateTool(_))));
    }

    #[tokio::test]
    async fn test_invalid_parameters_rejected() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool)).unwrap();

        let result = tool_system
            .execute_tool("echo", &json!({"message": 42}))
            .await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_unparsed_arguments_rejected_before_execution() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Arc::new(EchoTool)).unwrap();

        let result = tool_system.execute_tool("echo", &json!("{not json")).await;
        match result {
            Err(ToolError::InvalidArguments(message)) => assert!(message.contains("{not json")),
            other => panic!("expected invalid arguments, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_execution_unknown_tool() {
        let tool_system = ToolSystem::new();
        let result = tool_system.execute_tool("unknown", &json!({})).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }
}
