use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trading_common::data::PriceSeries;

use crate::backtest::{
    ConfirmedSignal, Metrics, PipelineOutput, RawSignal, Trade, TradeSide, TrialResult,
    WindowConfig, WindowRange,
};

/// Retry policy for transient price source failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum fetch attempts, including the first
    pub max_retry_attempts: u32,
    /// Delay between retry attempts (in milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// One interactive backtest. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub windows: Option<WindowConfig>,
    pub initial_capital: Option<f64>,
    pub use_confirmation: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub short_range: Option<WindowRange>,
    pub long_range: Option<WindowRange>,
    pub parallel: Option<bool>,
    pub top_n: Option<usize>,
}

/// Convert to cents for display
pub fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// Money figures of a run, rounded to cents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalSummary {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub profit: Decimal,
    /// Percentage, two decimals
    pub return_pct: Decimal,
}

impl CapitalSummary {
    pub fn new(initial_capital: f64, final_capital: f64) -> Self {
        let return_pct = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        Self {
            initial_capital: to_money(initial_capital),
            final_capital: to_money(final_capital),
            profit: to_money(final_capital - initial_capital),
            return_pct: to_money(return_pct),
        }
    }
}

/// Executed trade with the bar time attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub index: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub side: TradeSide,
    pub price: f64,
    pub shares: f64,
    pub capital: f64,
}

impl TradeRecord {
    pub fn new(trade: &Trade, series: &PriceSeries) -> Self {
        Self {
            index: trade.index,
            timestamp: series.get(trade.index).map(|p| p.timestamp),
            side: trade.side,
            price: trade.price,
            shares: trade.shares,
            capital: trade.capital,
        }
    }
}

/// Everything a chart or table needs to show one backtest
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub windows: WindowConfig,
    pub use_confirmation: bool,
    pub timestamps: Vec<DateTime<Utc>>,
    pub prices: Vec<f64>,
    pub short_ma: Vec<Option<f64>>,
    pub long_ma: Vec<Option<f64>>,
    pub raw_signals: Vec<Option<RawSignal>>,
    pub signals: Vec<ConfirmedSignal>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<f64>,
    pub final_capital: f64,
    pub summary: CapitalSummary,
    pub metrics: Metrics,
}

impl BacktestReport {
    pub fn new(
        source: &str,
        request: &BacktestRequest,
        series: &PriceSeries,
        output: PipelineOutput,
        windows: WindowConfig,
        use_confirmation: bool,
        metrics: Metrics,
    ) -> Self {
        let trades = output
            .result
            .trades
            .iter()
            .map(|t| TradeRecord::new(t, series))
            .collect();

        Self {
            symbol: series.symbol().to_string(),
            source: source.to_string(),
            start: request.start,
            end: request.end,
            windows,
            use_confirmation,
            timestamps: series.timestamps().to_vec(),
            prices: series.prices().to_vec(),
            short_ma: output.averages.short,
            long_ma: output.averages.long,
            raw_signals: output.signals.raw,
            signals: output.signals.confirmed,
            trades,
            summary: CapitalSummary::new(output.result.initial_capital, output.result.final_capital),
            final_capital: output.result.final_capital,
            equity_curve: output.result.equity_curve,
            metrics,
        }
    }
}

/// Outcome of a grid sweep
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub symbol: String,
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub observations: usize,
    pub short_range: WindowRange,
    pub long_range: WindowRange,
    pub evaluated: usize,
    pub best_window: WindowConfig,
    pub best_profit: f64,
    pub summary: CapitalSummary,
    pub leaderboard: Vec<TrialResult>,
    pub elapsed_ms: u128,
}
