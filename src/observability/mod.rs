//! Observability: structured logging and in-memory log capture

pub mod capture;
pub mod logging;

// Re-export for convenience
pub use capture::LogBuffer;
pub use logging::{init_logging, LogFormat, LoggingConfig};

// Span macros for structured logging
pub use logging::{crew_span, task_span, tool_span};
