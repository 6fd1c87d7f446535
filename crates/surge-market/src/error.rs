//! Market client error types.
//!
//! These errors stay inside the crate's retry machinery; callers of the
//! fetch methods only ever see empty results for data-path failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,
}

pub type MarketResult<T> = Result<T, MarketError>;
