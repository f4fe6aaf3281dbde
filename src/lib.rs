//! Trello Board Analyzer
//!
//! Fetches the cards of one Trello board and runs them through a small crew of
//! LLM agents that summarize activity and write a markdown report.
//!
//! # Overview
//!
//! - [`trello`]: board fetcher over the Trello REST API
//! - [`crew`]: agents, tasks and the sequential collect/analyze/report pipeline
//! - [`llm`]: chat-completion provider abstraction with an OpenAI client
//! - [`tools`]: tool registry with JSON schema validation
//! - [`credentials`]: credential sources (environment, dotfile)
//! - [`config`]: YAML agent and task definitions
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use trello_analyzer::config::CrewConfig;
//! use trello_analyzer::credentials::Credentials;
//! use trello_analyzer::crew::AnalysisPipeline;
//! use trello_analyzer::llm::{OpenAiConfig, OpenAiProvider};
//! use trello_analyzer::trello::{TrelloClient, TrelloClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CrewConfig::load_from_files(
//!     Path::new("config/agents.yaml"),
//!     Path::new("config/tasks.yaml"),
//! )?;
//! let credentials = Credentials::new("trello-key", "trello-token", "board-id", "sk-...");
//!
//! let fetcher = Arc::new(TrelloClient::new(TrelloClientConfig::default())?);
//! let llm = Arc::new(OpenAiProvider::new(OpenAiConfig::new(
//!     credentials.llm_api_key.clone(),
//! ))?);
//!
//! let output = AnalysisPipeline::new(config, fetcher, llm)
//!     .run(&credentials)
//!     .await?;
//! println!("{}", output.report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod crew;
pub mod error;
pub mod llm;
pub mod observability;
pub mod render;
pub mod testing;
pub mod tools;
pub mod trello;

pub use config::CrewConfig;
pub use credentials::{CredentialStore, Credentials, DotenvStore, EnvCredentialStore};
pub use crew::{AnalysisPipeline, CrewOutput, UsageMetrics};
pub use error::{AppError, AppResult};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
pub use trello::{BoardFetcher, BoardSnapshot, FetchError, TrelloClient};
