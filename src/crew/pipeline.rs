//! Sequential analysis pipeline
//!
//! Three stages run in a fixed order over a [`BoardContext`]:
//! collect (data collection agent with the board fetcher tool), analyze and
//! report (analysis agent, no tools). Each stage sees every earlier output.

use crate::config::{
    CrewConfig, ANALYSIS_AGENT, DATA_ANALYSIS_TASK, DATA_COLLECTION_AGENT, DATA_COLLECTION_TASK,
    REPORT_GENERATION_TASK,
};
use crate::credentials::Credentials;
use crate::crew::{BoardContext, CrewAgent, TaskOutput, TaskSpec, UsageMetrics};
use crate::crew_span;
use crate::error::{AppError, AppResult};
use crate::llm::LlmProvider;
use crate::tools::{BoardDataFetcherTool, ToolError, ToolSystem};
use crate::trello::BoardFetcher;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

/// The three pipeline stages, in execution order
#[async_trait]
pub trait AnalysisStages: Send + Sync {
    async fn collect(&self, context: &BoardContext) -> AppResult<TaskOutput>;
    async fn analyze(&self, context: &BoardContext) -> AppResult<TaskOutput>;
    async fn report(&self, context: &BoardContext) -> AppResult<TaskOutput>;
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    pub run_id: Uuid,
    pub board_id: String,
    /// Raw text of the final task
    pub report: String,
    pub usage: UsageMetrics,
    pub tasks: Vec<TaskOutput>,
}

/// Run the stages in order, threading the context through
pub async fn execute_stages(
    stages: &dyn AnalysisStages,
    board_id: &str,
) -> AppResult<CrewOutput> {
    let mut context = BoardContext::new(board_id);

    let collected = stages.collect(&context).await?;
    context.push(collected);

    let analyzed = stages.analyze(&context).await?;
    context.push(analyzed);

    let reported = stages.report(&context).await?;
    let report = reported.raw.clone();
    context.push(reported);

    Ok(CrewOutput {
        run_id: Uuid::new_v4(),
        board_id: board_id.to_string(),
        report,
        usage: context.usage(),
        tasks: context.into_outputs(),
    })
}

/// Two agents and three tasks built from configuration for one board
pub struct Crew {
    collector: CrewAgent,
    analyst: CrewAgent,
    collection_task: TaskSpec,
    analysis_task: TaskSpec,
    report_task: TaskSpec,
}

impl Crew {
    /// Build the crew for the given credentials.
    ///
    /// The board fetcher tool is bound to these credentials; nothing is read
    /// from the process environment.
    pub fn build(
        config: &CrewConfig,
        credentials: &Credentials,
        fetcher: Arc<dyn BoardFetcher>,
        llm: Arc<dyn LlmProvider>,
        model_override: Option<&str>,
    ) -> AppResult<Self> {
        let mut collector_tools = ToolSystem::new();
        collector_tools
            .register(Arc::new(BoardDataFetcherTool::new(
                fetcher,
                credentials.board_id.clone(),
                credentials.api_key.clone(),
                credentials.token.clone(),
            )))
            .map_err(|e: ToolError| AppError::pipeline_failed(e.to_string()))?;

        let collector = CrewAgent::from_definition(
            config.agent(DATA_COLLECTION_AGENT)?,
            llm.clone(),
            collector_tools,
            model_override,
        );
        let analyst = CrewAgent::from_definition(
            config.agent(ANALYSIS_AGENT)?,
            llm,
            ToolSystem::new(),
            model_override,
        );

        let inputs = BTreeMap::from([("board_id", credentials.board_id.as_str())]);
        let task = |key: &'static str| -> AppResult<TaskSpec> {
            Ok(TaskSpec::from_definition(key, &config.task(key)?.render(&inputs)))
        };

        Ok(Self {
            collector,
            analyst,
            collection_task: task(DATA_COLLECTION_TASK)?,
            analysis_task: task(DATA_ANALYSIS_TASK)?,
            report_task: task(REPORT_GENERATION_TASK)?,
        })
    }
}

#[async_trait]
impl AnalysisStages for Crew {
    async fn collect(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.collector
            .execute(&self.collection_task, context.context_text().as_deref())
            .await
    }

    async fn analyze(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.analyst
            .execute(&self.analysis_task, context.context_text().as_deref())
            .await
    }

    async fn report(&self, context: &BoardContext) -> AppResult<TaskOutput> {
        self.analyst
            .execute(&self.report_task, context.context_text().as_deref())
            .await
    }
}

/// Runs the analysis crew, one run at a time
pub struct AnalysisPipeline {
    config: CrewConfig,
    fetcher: Arc<dyn BoardFetcher>,
    llm: Arc<dyn LlmProvider>,
    model_override: Option<String>,
    running: AtomicBool,
}

impl AnalysisPipeline {
    pub fn new(
        config: CrewConfig,
        fetcher: Arc<dyn BoardFetcher>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            config,
            fetcher,
            llm,
            model_override: None,
            running: AtomicBool::new(false),
        }
    }

    /// Use this model for every agent regardless of configuration
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validate credentials, then run collect, analyze and report.
    ///
    /// A second call while a run is in flight fails with `AlreadyRunning`.
    pub async fn run(&self, credentials: &Credentials) -> AppResult<CrewOutput> {
        credentials.validate()?;
        let _guard = RunGuard::acquire(&self.running)?;

        let crew = Crew::build(
            &self.config,
            credentials,
            self.fetcher.clone(),
            self.llm.clone(),
            self.model_override.as_deref(),
        )?;

        let span = crew_span!(board_id = %credentials.board_id);
        let output = execute_stages(&crew, &credentials.board_id)
            .instrument(span)
            .await?;

        info!(
            run_id = %output.run_id,
            board_id = %output.board_id,
            total_tokens = output.usage.total_tokens,
            successful_requests = output.usage.successful_requests,
            "Analysis run completed"
        );
        Ok(output)
    }
}

/// Marks a run in progress until dropped
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> AppResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AppError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
