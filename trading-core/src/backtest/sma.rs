// trading-core/src/backtest/sma.rs

use super::types::WindowConfig;
use serde::Serialize;

/// Simple moving average over `window` prices.
///
/// The output has the same length as `prices`. Index `i` holds the mean of
/// `prices[i + 1 - window ..= i]`, or `None` while the window does not fit.
/// A window of zero or longer than the series yields all `None`.
///
/// Every value is summed from its own slice, so the result depends only on
/// the input and is bit-identical across calls.
pub fn moving_average(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || window > prices.len() {
        return vec![None; prices.len()];
    }

    let divisor = window as f64;
    let mut averages = vec![None; window - 1];
    averages.extend(
        prices
            .windows(window)
            .map(|slice| Some(slice.iter().sum::<f64>() / divisor)),
    );

    averages
}

/// Short and long averages for one window pair, aligned to the price index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverages {
    pub short: Vec<Option<f64>>,
    pub long: Vec<Option<f64>>,
}

impl MovingAverages {
    pub fn compute(prices: &[f64], windows: &WindowConfig) -> Self {
        Self {
            short: moving_average(prices, windows.short_window),
            long: moving_average(prices, windows.long_window),
        }
    }

    pub fn len(&self) -> usize {
        self.short.len().min(self.long.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
