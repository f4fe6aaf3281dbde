//! Builtin tools

pub mod board_fetcher;

pub use board_fetcher::BoardDataFetcherTool;
