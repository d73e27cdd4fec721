use thiserror::Error;
use trading_common::data::DataError;

use crate::backtest::OptimizerError;
use crate::source::SourceError;

/// Service layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Price source error: {0}")]
    Source(#[from] SourceError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Retry limit exceeded: {0}")]
    RetryLimitExceeded(String),
}

impl ServiceError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::Source(e) => e.is_transient(),
            ServiceError::Data(_) => false,
            ServiceError::Optimizer(_) => false,
            ServiceError::Task(_) => true,
            ServiceError::Config(_) => false,
            ServiceError::Validation(_) => false,
            ServiceError::RetryLimitExceeded(_) => true,
        }
    }

    /// The request was fine but there were no prices for it
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            ServiceError::Source(SourceError::NoData { .. })
                | ServiceError::Optimizer(OptimizerError::NoData)
                | ServiceError::Data(DataError::Empty(_))
        )
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_recoverable_classification() {
        assert!(ServiceError::from(SourceError::Timeout).is_recoverable());
        assert!(!ServiceError::from(SourceError::InvalidSymbol("?".into())).is_recoverable());
        assert!(!ServiceError::Validation("bad window".into()).is_recoverable());
        assert!(!ServiceError::from(OptimizerError::NoData).is_recoverable());
    }

    #[test]
    fn test_no_data_classification() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = ServiceError::from(SourceError::NoData {
            symbol: "TSLA".into(),
            start: day,
            end: day,
        });

        assert!(err.is_no_data());
        assert!(ServiceError::from(OptimizerError::NoData).is_no_data());
        assert!(!ServiceError::Task("join".into()).is_no_data());
    }
}
