//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.
//! We test observable outcomes, not implementation details of YAML parsing.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use trello_analyzer::config::{ConfigError, CrewConfig, DEFAULT_MODEL};

const AGENTS: &str = r#"
data_collection_agent:
  role: Collector
  goal: Collect cards
  backstory: Knows Trello.
analysis_agent:
  role: Analyst
  goal: Find risks
  backstory: Has seen many boards.
  llm: gpt-4o
  temperature: 0.5
  max_iter: 3
"#;

const TASKS: &str = r#"
data_collection:
  description: Collect cards from {board_id}
  expected_output: Card list
data_analysis:
  description: Analyze
  expected_output: Findings
report_generation:
  description: Report
  expected_output: Markdown
"#;

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[test]
fn test_config_loads_successfully_from_valid_yaml() {
    let agents = yaml_file(AGENTS);
    let tasks = yaml_file(TASKS);

    let config = CrewConfig::load_from_files(agents.path(), tasks.path()).unwrap();

    let collector = config.agent("data_collection_agent").unwrap();
    assert_eq!(collector.role, "Collector");
    assert_eq!(collector.llm, None);
    assert_eq!(collector.temperature, None);
    assert_eq!(collector.max_iter, 20);

    let analyst = config.agent("analysis_agent").unwrap();
    assert_eq!(analyst.llm.as_deref(), Some("gpt-4o"));
    assert_eq!(analyst.temperature, Some(0.5));
    assert_eq!(analyst.max_iter, 3);

    assert_eq!(config.tasks.len(), 3);
    assert_ne!(DEFAULT_MODEL, "");
}

#[test]
fn test_shipped_config_is_valid() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = CrewConfig::load_from_files(
        &root.join("config/agents.yaml"),
        &root.join("config/tasks.yaml"),
    )
    .unwrap();

    assert!(config
        .task("data_collection")
        .unwrap()
        .description
        .contains("{board_id}"));
}

#[test]
fn test_extra_entries_are_allowed() {
    let agents = format!(
        "{AGENTS}\nreviewer:\n  role: Reviewer\n  goal: Review\n  backstory: Careful.\n"
    );
    let config = CrewConfig::from_yaml_strs(&agents, TASKS).unwrap();
    assert_eq!(config.agents.len(), 3);
}

#[test]
fn test_config_returns_error_when_task_missing() {
    let tasks = r#"
data_collection:
  description: Collect
  expected_output: Cards
data_analysis:
  description: Analyze
  expected_output: Findings
"#;

    let err = CrewConfig::from_yaml_strs(AGENTS, tasks).unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingKey {
            document: "tasks",
            key: "report_generation"
        }
    ));
    assert!(err.to_string().contains("report_generation"));
}

#[test]
fn test_config_returns_error_when_agent_field_missing() {
    let agents = r#"
data_collection_agent:
  role: Collector
  goal: Collect cards
analysis_agent:
  role: Analyst
  goal: Find risks
  backstory: Has seen many boards.
"#;

    let err = CrewConfig::from_yaml_strs(agents, TASKS).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse(_)));
    assert!(err.to_string().contains("backstory"));
}

#[test]
fn test_config_rejects_out_of_range_temperature() {
    let agents = AGENTS.replace("temperature: 0.5", "temperature: 3.5");
    let err = CrewConfig::from_yaml_strs(&agents, TASKS).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
}

#[test]
fn test_config_rejects_zero_max_iter() {
    let agents = AGENTS.replace("max_iter: 3", "max_iter: 0");
    let err = CrewConfig::from_yaml_strs(&agents, TASKS).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfig(_)));
}

#[test]
fn test_config_returns_error_for_invalid_yaml_syntax() {
    let err = CrewConfig::from_yaml_strs("data_collection_agent: [unclosed", TASKS).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse(_)));
}

#[test]
fn test_config_returns_error_for_missing_file() {
    let tasks = yaml_file(TASKS);
    let err =
        CrewConfig::load_from_files(Path::new("/nonexistent/agents.yaml"), tasks.path())
            .unwrap_err();

    match err {
        ConfigError::FileRead { path, .. } => assert!(path.contains("agents.yaml")),
        other => panic!("expected FileRead, got {other:?}"),
    }
}

#[test]
fn test_to_yaml_reloads_to_same_config() {
    let config = CrewConfig::from_yaml_strs(AGENTS, TASKS).unwrap();
    let yaml = config.to_yaml().unwrap();

    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    let agents = serde_yaml::to_string(&value["agents"]).unwrap();
    let tasks = serde_yaml::to_string(&value["tasks"]).unwrap();

    assert_eq!(CrewConfig::from_yaml_strs(&agents, &tasks).unwrap(), config);
}
