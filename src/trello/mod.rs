//! Trello board access
//!
//! The [`BoardFetcher`] trait is the seam between the pipeline and the REST
//! API. [`TrelloClient`] is the real implementation; tests substitute doubles.

pub mod card;
pub mod client;

pub use card::CardSummary;
pub use client::{TrelloClient, TrelloClientConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Card fields requested from the API
pub const CARD_FIELDS: &str = "name,idList,due,dateLastActivity,labels";

/// Cards of one board, in the order the API returned them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardSnapshot {
    cards: Vec<Value>,
}

impl BoardSnapshot {
    pub fn new(cards: Vec<Value>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Value] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Lenient typed view of every card for display
    pub fn summaries(&self) -> Vec<CardSummary> {
        self.cards.iter().map(CardSummary::from_value).collect()
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.cards)
    }
}

/// Fetches the cards of a board
#[async_trait]
pub trait BoardFetcher: Send + Sync {
    async fn fetch(
        &self,
        board_id: &str,
        api_key: &str,
        token: &str,
    ) -> Result<BoardSnapshot, FetchError>;
}

/// Board fetch errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// HTTP status for non-success responses
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
