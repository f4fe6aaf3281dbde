//! Trello Board Analyzer - Main Entry Point

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use trello_analyzer::config::CrewConfig;
use trello_analyzer::credentials::{
    mask_secret, CredentialStore, Credentials, DotenvStore, EnvCredentialStore,
};
use trello_analyzer::crew::AnalysisPipeline;
use trello_analyzer::error::{AppError, AppResult};
use trello_analyzer::llm::{OpenAiConfig, OpenAiProvider};
use trello_analyzer::observability::{init_logging, LogBuffer, LoggingConfig};
use trello_analyzer::render;
use trello_analyzer::trello::{BoardFetcher, BoardSnapshot, TrelloClient, TrelloClientConfig};

/// Analyze Trello board activity with a crew of LLM agents
#[derive(Parser)]
#[command(name = "trello-analyzer")]
#[command(about = "Analyze Trello board activity with a crew of LLM agents")]
#[command(version)]
struct Cli {
    /// Agent definitions
    #[arg(
        long,
        value_name = "FILE",
        default_value = "config/agents.yaml",
        global = true
    )]
    agents_config: PathBuf,

    /// Task definitions
    #[arg(
        long,
        value_name = "FILE",
        default_value = "config/tasks.yaml",
        global = true
    )]
    tasks_config: PathBuf,

    /// Dotfile used as credential fallback and by `credentials save`
    #[arg(long, value_name = "FILE", default_value = ".env", global = true)]
    env_file: PathBuf,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colors in tables
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the board and run the analysis crew
    Analyze(AnalyzeArgs),
    /// Fetch the board and print a card summary
    Fetch {
        #[command(flatten)]
        credentials: CredentialArgs,

        #[command(flatten)]
        endpoints: EndpointArgs,

        /// Print the raw card array as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage stored credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsCommand,
    },
    /// Inspect the crew configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum CredentialsCommand {
    /// Write credentials to the env file
    Save {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Show resolved credentials with secrets masked
    Show,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate agent and task definitions
    Validate {
        /// Print the parsed configuration
        #[arg(long)]
        show: bool,
    },
}

/// Credential flags; empty values fall back to the environment, then the env file
#[derive(Args, Debug, Clone, Default)]
struct CredentialArgs {
    /// Trello API key [fallback: TRELLO_API_KEY]
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Trello API token [fallback: TRELLO_API_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Trello board id [fallback: TRELLO_BOARD_ID]
    #[arg(long, value_name = "ID")]
    board_id: Option<String>,

    /// OpenAI API key [fallback: OPENAI_API_KEY]
    #[arg(long, value_name = "KEY")]
    openai_api_key: Option<String>,
}

impl CredentialArgs {
    fn to_credentials(&self) -> Credentials {
        Credentials::new(
            self.api_key.clone().unwrap_or_default(),
            self.token.clone().unwrap_or_default(),
            self.board_id.clone().unwrap_or_default(),
            self.openai_api_key.clone().unwrap_or_default(),
        )
    }
}

#[derive(Args, Debug, Clone)]
struct EndpointArgs {
    /// Trello REST base URL
    #[arg(long, env = "TRELLO_API_BASE", default_value = "https://api.trello.com/1")]
    trello_api_base: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    openai_api_base: String,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(flatten)]
    endpoints: EndpointArgs,

    /// Chat model for every agent, overriding the configuration
    #[arg(long)]
    model: Option<String>,

    /// Print the captured run log after the report
    #[arg(long)]
    show_logs: bool,

    /// Print the board summary after the report
    #[arg(long)]
    show_board: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Write the resolved credentials to the env file
    #[arg(long)]
    save_credentials: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let capture = match &cli.command {
        Commands::Analyze(args) if args.show_logs => Some(LogBuffer::new()),
        _ => None,
    };
    init_logging(
        LoggingConfig::from_env().with_verbosity(cli.verbose),
        capture.clone(),
    );

    info!("Starting trello-analyzer v{}", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Analyze(args) => run_analyze(&cli, args, capture).await,
        Commands::Fetch {
            credentials,
            endpoints,
            json,
        } => run_fetch(&cli, credentials, endpoints, *json).await,
        Commands::Credentials { action } => handle_credentials_command(&cli, action),
        Commands::Config { action } => handle_config_command(&cli, action),
    };

    if let Err(e) = result {
        let message = e.user_message();
        error!("Command failed: {}", message);
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

/// Flags win over the environment, which wins over the env file
fn resolve_credentials(cli: &Cli, args: &CredentialArgs) -> AppResult<Credentials> {
    let from_env = EnvCredentialStore::process().load()?;
    let from_file = DotenvStore::new(&cli.env_file).load()?;
    Ok(args.to_credentials().or(from_env).or(from_file))
}

fn build_fetcher(endpoints: &EndpointArgs) -> AppResult<TrelloClient> {
    Ok(TrelloClient::new(TrelloClientConfig {
        base_url: endpoints.trello_api_base.clone(),
        ..Default::default()
    })?)
}

async fn run_analyze(cli: &Cli, args: &AnalyzeArgs, capture: Option<LogBuffer>) -> AppResult<()> {
    let credentials = resolve_credentials(cli, &args.credentials)?;
    credentials.validate()?;

    if args.save_credentials {
        let store = DotenvStore::new(&cli.env_file);
        store.save(&credentials)?;
        info!(path = %store.path().display(), "Credentials saved");
    }

    let config = CrewConfig::load_from_files(&cli.agents_config, &cli.tasks_config)?;
    let fetcher = Arc::new(build_fetcher(&args.endpoints)?);
    let llm = Arc::new(OpenAiProvider::new(
        OpenAiConfig::new(credentials.llm_api_key.clone())
            .with_base_url(args.endpoints.openai_api_base.clone()),
    )?);

    let mut pipeline = AnalysisPipeline::new(config, fetcher.clone(), llm);
    if let Some(model) = &args.model {
        pipeline = pipeline.with_model(model.clone());
    }
    let output = pipeline.run(&credentials).await?;

    let board = if args.show_board {
        fetch_board_summary(fetcher.as_ref(), &credentials).await
    } else {
        None
    };
    let logs = capture.map(|buffer| buffer.lines());

    match args.format {
        OutputFormat::Markdown => {
            println!("{}", render::format_report(&output.report));
            println!("{}", render::format_usage(&output.usage, cli.no_color));
            if let Some(snapshot) = &board {
                println!("\n{}", render::format_board(snapshot, Utc::now(), cli.no_color));
            }
            if let Some(lines) = &logs {
                println!("\n{}", render::format_logs(lines));
            }
        }
        OutputFormat::Json => println!(
            "{}",
            render::format_run_json(&output, board.as_ref(), logs.as_deref())
        ),
    }

    Ok(())
}

/// Display-only fetch; a failure is reported but does not fail the run
async fn fetch_board_summary(
    fetcher: &dyn BoardFetcher,
    credentials: &Credentials,
) -> Option<BoardSnapshot> {
    match fetcher
        .fetch(&credentials.board_id, &credentials.api_key, &credentials.token)
        .await
    {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            let message = AppError::from(e).user_message();
            warn!(error = %message, "Board summary unavailable");
            eprintln!("Error fetching Trello data: {message}");
            None
        }
    }
}

async fn run_fetch(
    cli: &Cli,
    args: &CredentialArgs,
    endpoints: &EndpointArgs,
    json: bool,
) -> AppResult<()> {
    let credentials = resolve_credentials(cli, args)?;
    credentials.validate()?;

    let fetcher = build_fetcher(endpoints)?;
    let snapshot = fetcher
        .fetch(&credentials.board_id, &credentials.api_key, &credentials.token)
        .await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "[]".to_string())
        );
    } else {
        println!("{}", render::format_board(&snapshot, Utc::now(), cli.no_color));
    }
    Ok(())
}

fn handle_credentials_command(cli: &Cli, action: &CredentialsCommand) -> AppResult<()> {
    match action {
        CredentialsCommand::Save { credentials } => {
            let resolved = resolve_credentials(cli, credentials)?;
            let store = DotenvStore::new(&cli.env_file);
            store.save(&resolved)?;
            println!("Credentials saved to {}", store.describe());
        }
        CredentialsCommand::Show => {
            let resolved = resolve_credentials(cli, &CredentialArgs::default())?;
            for (name, value) in resolved.to_pairs() {
                println!("{name:<18} {}", mask_secret(value));
            }
        }
    }
    Ok(())
}

fn handle_config_command(cli: &Cli, action: &ConfigCommand) -> AppResult<()> {
    match action {
        ConfigCommand::Validate { show } => {
            let config = CrewConfig::load_from_files(&cli.agents_config, &cli.tasks_config)?;
            println!(
                "Configuration is valid: {} agents, {} tasks",
                config.agents.len(),
                config.tasks.len()
            );
            if *show {
                println!("\n{}", config.to_yaml()?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trello_analyzer::testing::MockBoardFetcher;
    use trello_analyzer::trello::FetchError;

    fn credentials() -> Credentials {
        Credentials::new("key", "token", "board-1", "sk-test")
    }

    #[tokio::test]
    async fn test_board_summary_fetch_failure_is_not_fatal() {
        let fetcher = MockBoardFetcher::with_error(FetchError::Status {
            status: 404,
            body: "board not found".to_string(),
        });

        let board = fetch_board_summary(&fetcher, &credentials()).await;

        assert!(board.is_none());
        assert_eq!(fetcher.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_board_summary_fetch_returns_snapshot() {
        let fetcher =
            MockBoardFetcher::with_snapshot(BoardSnapshot::new(vec![json!({"name": "Ship it"})]));

        let board = fetch_board_summary(&fetcher, &credentials()).await;

        assert_eq!(board.map(|snapshot| snapshot.len()), Some(1));
    }
}
