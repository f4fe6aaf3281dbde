//! Crew configuration loaded from YAML
//!
//! Two static documents describe the crew: agent definitions (role, goal,
//! backstory) and task definitions (description, expected output). Both are
//! read once at startup and validated for the keys the pipeline needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Agent key for the data collection agent
pub const DATA_COLLECTION_AGENT: &str = "data_collection_agent";
/// Agent key for the analysis agent
pub const ANALYSIS_AGENT: &str = "analysis_agent";
/// Task key for the data collection task
pub const DATA_COLLECTION_TASK: &str = "data_collection";
/// Task key for the data analysis task
pub const DATA_ANALYSIS_TASK: &str = "data_analysis";
/// Task key for the report generation task
pub const REPORT_GENERATION_TASK: &str = "report_generation";

const REQUIRED_AGENTS: [&str; 2] = [DATA_COLLECTION_AGENT, ANALYSIS_AGENT];
const REQUIRED_TASKS: [&str; 3] = [
    DATA_COLLECTION_TASK,
    DATA_ANALYSIS_TASK,
    REPORT_GENERATION_TASK,
];

/// Default chat model when an agent does not name one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Complete crew configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewConfig {
    pub agents: BTreeMap<String, AgentDefinition>,
    pub tasks: BTreeMap<String, TaskDefinition>,
}

/// One agent entry from the agents document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Chat model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum LLM round-trips for a single task
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

fn default_max_iter() -> usize {
    20
}

/// One task entry from the tasks document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    pub description: String,
    pub expected_output: String,
    /// Agent key this task is written for (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl TaskDefinition {
    /// Interpolate `{name}` placeholders with the given inputs.
    ///
    /// Unknown placeholders are left untouched so prompts may contain braces.
    pub fn render(&self, inputs: &BTreeMap<&str, &str>) -> TaskDefinition {
        let interpolate = |text: &str| {
            inputs.iter().fold(text.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        };

        TaskDefinition {
            description: interpolate(&self.description),
            expected_output: interpolate(&self.expected_output),
            agent: self.agent.clone(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Missing required key '{key}' in {document} configuration")]
    MissingKey {
        document: &'static str,
        key: &'static str,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CrewConfig {
    /// Load and validate both YAML documents
    pub fn load_from_files(agents_path: &Path, tasks_path: &Path) -> Result<Self, ConfigError> {
        let agents = read_file(agents_path)?;
        let tasks = read_file(tasks_path)?;
        Self::from_yaml_strs(&agents, &tasks)
    }

    /// Parse and validate both YAML documents from strings
    pub fn from_yaml_strs(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, ConfigError> {
        let config = CrewConfig {
            agents: serde_yaml::from_str(agents_yaml)?,
            tasks: serde_yaml::from_str(tasks_yaml)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every required agent and task is present and sane
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in REQUIRED_AGENTS {
            let agent = self.agents.get(key).ok_or(ConfigError::MissingKey {
                document: "agents",
                key,
            })?;
            if agent.max_iter == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "agent '{key}' must allow at least one iteration"
                )));
            }
            if let Some(temperature) = agent.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "agent '{key}' temperature {temperature} is outside 0.0..=2.0"
                    )));
                }
            }
        }

        for key in REQUIRED_TASKS {
            if !self.tasks.contains_key(key) {
                return Err(ConfigError::MissingKey {
                    document: "tasks",
                    key,
                });
            }
        }

        Ok(())
    }

    /// Look up a required agent definition
    pub fn agent(&self, key: &'static str) -> Result<&AgentDefinition, ConfigError> {
        self.agents.get(key).ok_or(ConfigError::MissingKey {
            document: "agents",
            key,
        })
    }

    /// Look up a required task definition
    pub fn task(&self, key: &'static str) -> Result<&TaskDefinition, ConfigError> {
        self.tasks.get(key).ok_or(ConfigError::MissingKey {
            document: "tasks",
            key,
        })
    }

    /// Render the configuration back to YAML for display
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self::from_yaml_strs(TEST_AGENTS_YAML, TEST_TASKS_YAML).expect("Test config should parse")
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
const TEST_AGENTS_YAML: &str = r#"
data_collection_agent:
  role: Data Collection Specialist
  goal: Gather every card from board {board_id}
  backstory: You know the Trello API inside out.
analysis_agent:
  role: Project Analyst
  goal: Turn raw card data into insight
  backstory: You have run many sprints.
  llm: gpt-4o
  temperature: 0.2
  max_iter: 5
"#;

#[cfg(test)]
const TEST_TASKS_YAML: &str = r#"
data_collection:
  description: Collect all cards from board {board_id}.
  expected_output: A list of cards with their metadata.
  agent: data_collection_agent
data_analysis:
  description: Analyze the collected cards.
  expected_output: Bottlenecks and overdue work.
report_generation:
  description: Write the final report.
  expected_output: A markdown report.
"#;
