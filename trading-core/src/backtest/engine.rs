// trading-core/src/backtest/engine.rs

use super::types::*;
use tracing::{debug, info};

/// Single-position, long-only account.
///
/// The account is always either fully in cash or fully invested, so cash and
/// shares can never both be held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    InCash { capital: f64 },
    InPosition { shares: f64 },
}

impl PositionState {
    pub fn new(initial_capital: f64) -> Self {
        PositionState::InCash {
            capital: initial_capital,
        }
    }

    /// Apply one confirmed signal at `price`.
    ///
    /// Buys only from cash, sells only a non-empty position; every other
    /// combination leaves the state untouched.
    pub fn on_signal(self, signal: ConfirmedSignal, price: f64, index: usize) -> (Self, Option<Trade>) {
        match (self, signal) {
            (PositionState::InCash { capital }, ConfirmedSignal::Buy) => {
                let shares = capital / price;
                let trade = Trade {
                    index,
                    side: TradeSide::Buy,
                    price,
                    shares,
                    capital,
                };
                (PositionState::InPosition { shares }, Some(trade))
            }
            (PositionState::InPosition { shares }, ConfirmedSignal::Sell) if shares > 0.0 => {
                let capital = shares * price;
                let trade = Trade {
                    index,
                    side: TradeSide::Sell,
                    price,
                    shares,
                    capital,
                };
                (PositionState::InCash { capital }, Some(trade))
            }
            (state, _) => (state, None),
        }
    }

    /// Value of the account marked at `price`
    pub fn value(&self, price: f64) -> f64 {
        match *self {
            PositionState::InCash { capital } => capital,
            PositionState::InPosition { shares } => shares * price,
        }
    }
}

/// Final account value without recording trades or equity.
///
/// Used as the optimizer's objective; always agrees with
/// [`BacktestEngine::run`]'s `final_capital`.
pub fn final_capital(prices: &[f64], signals: &[ConfirmedSignal], initial_capital: f64) -> f64 {
    let steps = prices.len().min(signals.len());
    let mut state = PositionState::new(initial_capital);

    for i in 1..steps {
        state = state.on_signal(signals[i], prices[i], i).0;
    }

    match prices.last() {
        Some(&last) => state.value(last),
        None => initial_capital,
    }
}

/// Walks a confirmed signal series and simulates the account
pub struct BacktestEngine {
    initial_capital: f64,
}

impl BacktestEngine {
    pub fn new(initial_capital: f64) -> Self {
        Self { initial_capital }
    }

    pub fn run(&self, prices: &[f64], signals: &[ConfirmedSignal]) -> BacktestResult {
        debug!(
            "Running backtest over {} prices with initial capital {:.2}",
            prices.len(),
            self.initial_capital
        );

        let steps = prices.len().min(signals.len());
        let mut state = PositionState::new(self.initial_capital);
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(prices.len());

        if let Some(&first) = prices.first() {
            equity_curve.push(state.value(first));
        }

        // Index 0 never trades
        for i in 1..prices.len() {
            if i < steps {
                let (next, trade) = state.on_signal(signals[i], prices[i], i);
                if let Some(trade) = trade {
                    debug!(
                        "Executed trade at index {}: {} {:.6} @ {:.4}",
                        trade.index, trade.side, trade.shares, trade.price
                    );
                    trades.push(trade);
                }
                state = next;
            }
            equity_curve.push(state.value(prices[i]));
        }

        let final_capital = match prices.last() {
            Some(&last) => state.value(last),
            None => self.initial_capital,
        };

        info!(
            "Backtest completed: {} trades, final capital {:.2}",
            trades.len(),
            final_capital
        );

        BacktestResult {
            initial_capital: self.initial_capital,
            final_capital,
            trades,
            equity_curve,
        }
    }
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPITAL)
    }
}
