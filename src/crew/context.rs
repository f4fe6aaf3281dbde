//! Context handed from one stage to the next

use crate::crew::{TaskOutput, UsageMetrics};

/// Separator between prior task outputs in an agent prompt
pub const CONTEXT_DIVIDER: &str = "\n\n----------\n\n";

/// State threaded through the collect, analyze and report stages
#[derive(Debug, Clone, Default)]
pub struct BoardContext {
    pub board_id: String,
    outputs: Vec<TaskOutput>,
}

impl BoardContext {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            outputs: Vec::new(),
        }
    }

    pub fn push(&mut self, output: TaskOutput) {
        self.outputs.push(output);
    }

    pub fn into_outputs(self) -> Vec<TaskOutput> {
        self.outputs
    }

    /// Every prior output in execution order, or `None` before the first task
    pub fn context_text(&self) -> Option<String> {
        if self.outputs.is_empty() {
            return None;
        }
        Some(
            self.outputs
                .iter()
                .map(|output| output.raw.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_DIVIDER),
        )
    }

    pub fn usage(&self) -> UsageMetrics {
        self.outputs.iter().map(|output| output.usage).sum()
    }
}
