// trading-core/src/backtest/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capital every run starts with unless configured otherwise
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Short/long moving average window pair.
///
/// Only `short_window < long_window` is meaningful. Other combinations are
/// skipped by the optimizer and never trade in a single backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowConfig {
    pub short_window: usize,
    pub long_window: usize,
}

impl WindowConfig {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.short_window >= 1 && self.short_window < self.long_window
    }

    /// Number of prices needed before both averages exist
    pub fn lookback(&self) -> usize {
        self.short_window.max(self.long_window)
    }
}

impl fmt::Display for WindowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SMA({}/{})", self.short_window, self.long_window)
    }
}

/// Regime classification at one index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawSignal {
    /// Short average strictly above the long average
    Long,
    /// Short average below or equal to the long average
    Flat,
}

/// Action derived from the raw regime series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfirmedSignal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl ConfirmedSignal {
    pub fn is_hold(self) -> bool {
        self == ConfirmedSignal::Hold
    }
}

impl From<RawSignal> for ConfirmedSignal {
    fn from(raw: RawSignal) -> Self {
        match raw {
            RawSignal::Long => ConfirmedSignal::Buy,
            RawSignal::Flat => ConfirmedSignal::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A full conversion between cash and shares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Index into the price series where the trade executed
    pub index: usize,
    pub side: TradeSide,
    pub price: f64,
    pub shares: f64,
    /// Cash spent on a buy, cash received on a sell
    pub capital: f64,
}

/// Outcome of a single simulated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    /// Mark-to-market value at every index of the series
    pub equity_curve: Vec<f64>,
}

/// Score of one window pair inside a grid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Position among the evaluated (non-skipped) pairs in enumeration order
    pub ordinal: usize,
    pub window: WindowConfig,
    pub final_capital: f64,
}

/// Best window pair found by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_window: WindowConfig,
    /// Objective value of the best pair: its final capital
    pub best_profit: f64,
    /// Number of window pairs evaluated
    pub evaluated: usize,
    /// Highest scoring trials, best first
    pub leaderboard: Vec<TrialResult>,
}
