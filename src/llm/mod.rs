//! LLM provider abstraction layer
//!
//! A provider-agnostic chat-completion interface with an OpenAI-compatible
//! implementation.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
