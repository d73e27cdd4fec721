pub mod backtest;
pub mod errors;
pub mod types;

// Re-export main interfaces
pub use backtest::BacktestService;
pub use errors::ServiceError;
pub use types::*;
