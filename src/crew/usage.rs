//! Token usage accounting

use crate::llm::TokenUsage;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Flat price in USD per million prompt or completion tokens
pub const COST_PER_MILLION_TOKENS: f64 = 0.150;

/// Cumulative token counters for a task or a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Number of LLM calls that returned a response
    pub successful_requests: u64,
}

impl UsageMetrics {
    /// Count one successful completion
    pub fn record(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total_tokens);
        self.successful_requests += 1;
    }

    /// Estimated cost in USD
    pub fn cost(&self) -> f64 {
        estimate_cost(self.prompt_tokens, self.completion_tokens)
    }
}

impl AddAssign for UsageMetrics {
    fn add_assign(&mut self, other: Self) {
        self.total_tokens += other.total_tokens;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.successful_requests += other.successful_requests;
    }
}

impl std::iter::Sum for UsageMetrics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, usage| {
            acc += usage;
            acc
        })
    }
}

/// Cost of a token count at the flat rate
pub fn estimate_cost(prompt_tokens: u64, completion_tokens: u64) -> f64 {
    COST_PER_MILLION_TOKENS * (prompt_tokens + completion_tokens) as f64 / 1_000_000.0
}
