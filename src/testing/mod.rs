//! Testing utilities and mock implementations
//!
//! Mocks for the LLM provider, the board fetcher and the pipeline stages, so
//! the analyzer can be tested without network access.

pub mod mocks;

pub use mocks::*;
