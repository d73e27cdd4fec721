// =================================================================
// source/errors.rs - Error Types
// =================================================================

use chrono::NaiveDate;
use thiserror::Error;
use trading_common::data::DataError;

/// Error types for price history lookups
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No data found for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Invalid price data: {0}")]
    Data(#[from] DataError),

    #[error("Connection timeout")]
    Timeout,

    #[error("Price source API error: {0}")]
    ApiError(String),
}

impl SourceError {
    /// The request was valid but the source has nothing for it
    pub fn is_no_data(&self) -> bool {
        matches!(self, SourceError::NoData { .. })
    }

    /// Worth retrying after a short delay
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::NetworkError(_) | SourceError::Timeout | SourceError::RateLimit(_)
        )
    }
}

// Convert from common error types
impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_connect() {
            SourceError::NetworkError(err.to_string())
        } else if err.is_decode() {
            SourceError::ParseError(err.to_string())
        } else {
            SourceError::ApiError(err.to_string())
        }
    }
}
