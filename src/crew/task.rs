//! Crew tasks and their outputs

use crate::config::TaskDefinition;
use crate::crew::UsageMetrics;
use serde::{Deserialize, Serialize};

/// A rendered task ready to hand to an agent
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub expected_output: String,
}

impl TaskSpec {
    pub fn from_definition(name: impl Into<String>, definition: &TaskDefinition) -> Self {
        Self {
            name: name.into(),
            description: definition.description.clone(),
            expected_output: definition.expected_output.clone(),
        }
    }
}

/// Result of one executed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent_role: String,
    pub raw: String,
    pub usage: UsageMetrics,
}
