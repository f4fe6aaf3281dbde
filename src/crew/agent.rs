//! Role-bound crew agent
//!
//! An agent turns one task into a conversation with the LLM. While the model
//! asks for tools, they are executed through the agent's [`ToolSystem`] and
//! their results appended to the conversation. The loop ends on the first
//! reply without tool calls.

use crate::config::{AgentDefinition, DEFAULT_MODEL};
use crate::crew::{TaskOutput, TaskSpec, UsageMetrics};
use crate::error::{AppError, AppResult};
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider, Message, ToolCall};
use crate::tools::ToolSystem;
use crate::{task_span, tool_span};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// An LLM persona with a role, a goal and optional tools
pub struct CrewAgent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_iter: usize,
    tools: ToolSystem,
    llm: Arc<dyn LlmProvider>,
}

impl CrewAgent {
    /// Build an agent from its definition.
    ///
    /// `model_override` wins over the model named in the definition.
    pub fn from_definition(
        definition: &AgentDefinition,
        llm: Arc<dyn LlmProvider>,
        tools: ToolSystem,
        model_override: Option<&str>,
    ) -> Self {
        let model = model_override
            .or(definition.llm.as_deref())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        Self {
            role: definition.role.clone(),
            goal: definition.goal.clone(),
            backstory: definition.backstory.clone(),
            model,
            temperature: definition.temperature,
            max_iter: definition.max_iter,
            tools,
            llm,
        }
    }

    pub fn tools(&self) -> &ToolSystem {
        &self.tools
    }

    /// Run one task to completion
    pub async fn execute(&self, task: &TaskSpec, context: Option<&str>) -> AppResult<TaskOutput> {
        let span = task_span!(task = %task.name, agent = %self.role);
        self.run_tool_loop(task, context).instrument(span).await
    }

    async fn run_tool_loop(&self, task: &TaskSpec, context: Option<&str>) -> AppResult<TaskOutput> {
        let mut messages = vec![
            Message::system(build_system_prompt(
                &self.role,
                &self.goal,
                &self.backstory,
                &Utc::now().format("%Y-%m-%d").to_string(),
            )),
            Message::user(build_task_prompt(task, context)),
        ];
        let mut usage = UsageMetrics::default();
        let mut iteration = 0;

        loop {
            iteration += 1;
            check_iteration_limit(iteration, self.max_iter)?;

            let request = self.completion_request(messages.clone());
            let response = self.llm.complete(request).await.map_err(|e| {
                warn!(task = %task.name, error = %e, "LLM request failed");
                AppError::pipeline_failed(format!("LLM request failed: {e}"))
            })?;
            usage.record(&response.usage);

            debug!(
                task = %task.name,
                iteration,
                content_length = response.content.as_ref().map(|c| c.len()).unwrap_or(0),
                tool_calls = response.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
                finish_reason = ?response.finish_reason,
                tokens_used = response.usage.total_tokens,
                "LLM response"
            );

            add_assistant_response(&mut messages, &response);

            if response.wants_tools() {
                let tool_calls = response.tool_calls.as_deref().unwrap_or_default();
                let tool_results = self.execute_tool_calls(tool_calls).await;
                add_tool_results(&mut messages, &tool_results);
                continue;
            }

            info!(
                task = %task.name,
                iterations = iteration,
                total_tokens = usage.total_tokens,
                "Task completed"
            );
            return Ok(TaskOutput {
                task: task.name.clone(),
                agent_role: self.role.clone(),
                raw: response.content.unwrap_or_default(),
                usage,
            });
        }
    }

    fn completion_request(&self, messages: Vec<Message>) -> CompletionRequest {
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.descriptions())
        };

        CompletionRequest {
            messages,
            model: self.model.clone(),
            max_tokens: None,
            temperature: self.temperature,
            tools,
        }
    }

    async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut tool_results = Vec::with_capacity(tool_calls.len());
        for tool_call in tool_calls {
            let span = tool_span!(tool = %tool_call.name);
            let result = self.execute_single_tool_call(tool_call).instrument(span).await;
            tool_results.push(result);
        }
        tool_results
    }

    /// Failures are handed back to the model as text rather than aborting
    async fn execute_single_tool_call(&self, tool_call: &ToolCall) -> String {
        debug!(
            "Executing tool: {} with args: {}",
            tool_call.name, tool_call.arguments
        );

        match self
            .tools
            .execute_tool(&tool_call.name, &tool_call.arguments)
            .await
        {
            Ok(result) => format!("Tool {} returned: {}", tool_call.name, result),
            Err(e) => {
                warn!(tool = %tool_call.name, error = %e, "Tool call failed");
                format!("Tool {} failed: {}", tool_call.name, e)
            }
        }
    }
}

/// System prompt describing who the agent is
pub fn build_system_prompt(role: &str, goal: &str, backstory: &str, today: &str) -> String {
    format!(
        "You are {role}. {backstory}\nYour personal goal is: {goal}\n\nCurrent date: {today} (UTC)"
    )
}

/// User prompt for one task, with prior outputs appended as context
pub fn build_task_prompt(task: &TaskSpec, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.description, task.expected_output
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }

    prompt.push_str("\n\nBegin! This is VERY important to you, use the tools available and give your best Final Answer.");
    prompt
}

fn check_iteration_limit(iteration: usize, max_iter: usize) -> AppResult<()> {
    if iteration > max_iter {
        return Err(AppError::pipeline_failed(format!(
            "Agent exceeded maximum iterations ({max_iter})"
        )));
    }
    Ok(())
}

fn add_assistant_response(messages: &mut Vec<Message>, response: &CompletionResponse) {
    if let Some(content) = response.content.as_ref().filter(|c| !c.is_empty()) {
        messages.push(Message::assistant(content.clone()));
    }
}

fn add_tool_results(messages: &mut Vec<Message>, tool_results: &[String]) {
    if !tool_results.is_empty() {
        messages.push(Message::user(format!(
            "Tool results:\n{}",
            tool_results.join("\n")
        )));
    }
}
