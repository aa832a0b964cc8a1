//! Bar provider trait and structured error types.
//!
//! `BarProvider` abstracts over data sources (Yahoo Finance, the CSV
//! cache, in-memory fixtures for tests) so the screener can be wired to
//! any of them.

use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data available for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// A source of daily bars.
///
/// Returned series are ascending by date with no duplicate dates and
/// trimmed to the most recent `days` bars (fewer if the symbol has a
/// short history).
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the trailing `days` daily bars for a symbol.
    ///
    /// `force_refresh` bypasses any cache layer the provider carries.
    fn get(&self, symbol: &str, days: usize, force_refresh: bool) -> Result<Vec<Bar>, DataError>;
}
