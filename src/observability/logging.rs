//! Structured logging system using tracing crate
//!
//! Logs go to stderr so the report printed on stdout stays clean. An optional
//! [`LogBuffer`] receives a plain-text copy of every event for `--show-logs`.
//!
//! ## Log Format Options
//!
//! The `LOG_FORMAT` environment variable selects one of:
//!
//! - `json` - Structured JSON format for log aggregation systems
//! - `pretty` - Human-readable format with colors and indentation
//! - `compact` - Terminal-friendly format with colors but minimal spacing
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: Log level (ERROR, WARN, INFO, DEBUG, TRACE) - defaults to WARN
//! - `LOG_FORMAT`: Output format (json, pretty, compact) - defaults to compact
//! - `LOG_SPANS`: Include span events (true/false) - defaults to false
//! - `RUST_LOG`: Override log filtering (follows env_logger format)
//!
//! ## Examples
//!
//! ```bash
//! # Follow a run in detail
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG trello-analyzer analyze
//!
//! # Machine-readable logs next to the report
//! LOG_FORMAT=json LOG_LEVEL=INFO trello-analyzer analyze 2> run.log
//! ```

use crate::observability::LogBuffer;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Dependencies whose logs are capped at `warn`
const NOISY_TARGETS: [&str; 4] = ["hyper", "reqwest", "rustls", "h2"];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for structured logging (machine-readable)
    Json,
    /// Pretty format with colors and indentation (human-readable)
    Pretty,
    /// Compact format with colors but minimal spacing (terminal-friendly)
    Compact,
}

impl LogFormat {
    /// Parse log format from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            include_spans: false,
        }
    }
}

impl LoggingConfig {
    /// Read `LOG_LEVEL`, `LOG_FORMAT` and `LOG_SPANS` through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            level: lookup("LOG_LEVEL")
                .map(|level| parse_level(&level))
                .unwrap_or(defaults.level),
            format: lookup("LOG_FORMAT")
                .map(|format| LogFormat::parse(&format))
                .unwrap_or(defaults.format),
            include_spans: lookup("LOG_SPANS")
                .map(|spans| spans.to_lowercase() == "true")
                .unwrap_or(defaults.include_spans),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Raise the level by one step per `-v`, never lowering it
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        let requested = match verbose {
            0 => return self,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        // tracing orders levels by verbosity: TRACE > DEBUG > INFO
        if requested > self.level {
            self.level = requested;
        }
        self
    }
}

/// Parse a level name, defaulting to WARN
pub fn parse_level(level: &str) -> Level {
    match level.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "INFO" => Level::INFO,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::WARN,
    }
}

/// Filter at `level` with noisy dependencies capped at `warn`
pub fn base_filter(level: Level) -> EnvFilter {
    let mut directives = vec![level.to_string().to_lowercase()];
    directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")));
    EnvFilter::new(directives.join(","))
}

fn span_events(include_spans: bool) -> fmt::format::FmtSpan {
    if include_spans {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    }
}

/// Initialize logging; `capture` receives INFO and above regardless of `config.level`
pub fn init_logging(config: LoggingConfig, capture: Option<LogBuffer>) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => base_filter(config.level),
    };

    let stderr_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(span_events(config.include_spans))
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .with_span_events(span_events(config.include_spans))
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(true)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_span_events(span_events(config.include_spans))
            .boxed(),
    };

    let capture_layer = capture.map(|buffer| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .with_writer(buffer)
            .with_filter(base_filter(Level::INFO))
    });

    tracing_subscriber::registry()
        .with(stderr_layer.with_filter(filter))
        .with(capture_layer)
        .init();
}

/// Create a crew run span
#[macro_export]
macro_rules! crew_span {
    ($($field:tt)*) => {
        tracing::info_span!("crew_run", $($field)*)
    };
}

/// Create a task execution span with contextual information
#[macro_export]
macro_rules! task_span {
    ($($field:tt)*) => {
        tracing::info_span!("task_execution", $($field)*)
    };
}

/// Create a tool execution span
#[macro_export]
macro_rules! tool_span {
    ($($field:tt)*) => {
        tracing::info_span!("tool_execution", $($field)*)
    };
}

// Re-export macros for convenience
pub use {crew_span, task_span, tool_span};
