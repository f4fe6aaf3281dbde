//! Crew orchestration
//!
//! A small engine in the style of declarative agent frameworks: agents with a
//! role, goal and backstory execute tasks in a fixed order, each task
//! receiving the outputs of the tasks before it.

pub mod agent;
pub mod context;
pub mod pipeline;
pub mod task;
pub mod usage;

pub use agent::CrewAgent;
pub use context::{BoardContext, CONTEXT_DIVIDER};
pub use pipeline::{execute_stages, AnalysisPipeline, AnalysisStages, Crew, CrewOutput};
pub use task::{TaskOutput, TaskSpec};
pub use usage::{estimate_cost, UsageMetrics, COST_PER_MILLION_TOKENS};
