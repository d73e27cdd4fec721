// trading-core/src/backtest/metrics.rs

use super::types::*;
use serde::{Deserialize, Serialize};

/// Summary statistics for a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Percentage change from initial to final capital
    pub total_return: f64,
    pub total_trades: u32,
    /// Closed buy/sell pairs
    pub round_trips: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Percentage of round trips closed at a gain
    pub win_rate: f64,
    /// Largest peak-to-trough decline of the equity curve, in percent
    pub max_drawdown: f64,
    /// Annualised, 252 periods per year
    pub sharpe_ratio: f64,
    /// Fraction of steps spent holding shares
    pub exposure: f64,
}

pub struct MetricsCalculator {
    risk_free_rate: f64,
    periods_per_year: f64,
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
        }
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn calculate(&self, result: &BacktestResult) -> Metrics {
        let (winning_trades, losing_trades) = self.analyze_round_trips(&result.trades);
        let round_trips = winning_trades + losing_trades;
        let returns = self.calculate_returns(&result.equity_curve);

        Metrics {
            total_return: self.calculate_total_return(result.initial_capital, result.final_capital),
            total_trades: result.trades.len() as u32,
            round_trips,
            winning_trades,
            losing_trades,
            win_rate: self.calculate_win_rate(winning_trades, round_trips),
            max_drawdown: self.calculate_max_drawdown(&result.equity_curve),
            sharpe_ratio: self.calculate_sharpe_ratio(&returns),
            exposure: self.calculate_exposure(&result.trades, result.equity_curve.len()),
        }
    }

    fn analyze_round_trips(&self, trades: &[Trade]) -> (u32, u32) {
        let mut winning = 0;
        let mut losing = 0;
        let mut entry: Option<&Trade> = None;

        for trade in trades {
            match trade.side {
                TradeSide::Buy => entry = Some(trade),
                TradeSide::Sell => {
                    if let Some(buy) = entry.take() {
                        if trade.capital > buy.capital {
                            winning += 1;
                        } else {
                            losing += 1;
                        }
                    }
                }
            }
        }

        (winning, losing)
    }

    fn calculate_returns(&self, equity_curve: &[f64]) -> Vec<f64> {
        equity_curve
            .windows(2)
            .map(|w| if w[0] == 0.0 { 0.0 } else { (w[1] - w[0]) / w[0] })
            .collect()
    }

    fn calculate_total_return(&self, initial: f64, final_value: f64) -> f64 {
        if initial == 0.0 {
            return 0.0;
        }
        (final_value - initial) / initial * 100.0
    }

    fn calculate_win_rate(&self, winning: u32, total: u32) -> f64 {
        if total == 0 {
            return 0.0;
        }
        winning as f64 / total as f64 * 100.0
    }

    fn calculate_max_drawdown(&self, equity_curve: &[f64]) -> f64 {
        let mut peak = f64::MIN;
        let mut max_drawdown = 0.0;

        for &value in equity_curve {
            if value > peak {
                peak = value;
            } else if peak > 0.0 {
                let drawdown = (peak - value) / peak * 100.0;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        max_drawdown
    }

    fn calculate_sharpe_ratio(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let volatility = variance.sqrt() * self.periods_per_year.sqrt();

        if volatility == 0.0 {
            return 0.0;
        }

        (mean * self.periods_per_year - self.risk_free_rate) / volatility
    }

    fn calculate_exposure(&self, trades: &[Trade], steps: usize) -> f64 {
        if steps == 0 {
            return 0.0;
        }

        let mut invested_steps = 0;
        let mut entry_index: Option<usize> = None;
        for trade in trades {
            match trade.side {
                TradeSide::Buy => entry_index = Some(trade.index),
                TradeSide::Sell => {
                    if let Some(start) = entry_index.take() {
                        invested_steps += trade.index - start;
                    }
                }
            }
        }
        if let Some(start) = entry_index {
            invested_steps += steps - start;
        }

        invested_steps as f64 / steps as f64
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(index: usize, side: TradeSide, price: f64, capital: f64) -> Trade {
        Trade {
            index,
            side,
            price,
            shares: capital / price,
            capital,
        }
    }

    #[test]
    fn test_metrics_for_round_trips() {
        let result = BacktestResult {
            initial_capital: 1_000.0,
            final_capital: 1_100.0,
            trades: vec![
                trade(1, TradeSide::Buy, 10.0, 1_000.0),
                trade(3, TradeSide::Sell, 12.0, 1_200.0),
                trade(4, TradeSide::Buy, 12.0, 1_200.0),
                trade(6, TradeSide::Sell, 11.0, 1_100.0),
            ],
            equity_curve: vec![1_000.0, 1_000.0, 1_100.0, 1_200.0, 1_200.0, 1_150.0, 1_100.0, 1_100.0],
        };

        let metrics = MetricsCalculator::new().calculate(&result);

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.round_trips, 2);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert!((metrics.win_rate - 50.0).abs() < 1e-12);
        assert!((metrics.total_return - 10.0).abs() < 1e-12);
        assert!((metrics.max_drawdown - 100.0 / 12.0).abs() < 1e-9);
        assert!((metrics.exposure - 4.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_without_trades() {
        let result = BacktestResult {
            initial_capital: 10_000.0,
            final_capital: 10_000.0,
            trades: Vec::new(),
            equity_curve: vec![10_000.0; 5],
        };

        let metrics = MetricsCalculator::default().calculate(&result);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.exposure, 0.0);
    }

    #[test]
    fn test_open_position_counts_towards_exposure() {
        let result = BacktestResult {
            initial_capital: 100.0,
            final_capital: 150.0,
            trades: vec![trade(2, TradeSide::Buy, 10.0, 100.0)],
            equity_curve: vec![100.0, 100.0, 100.0, 150.0],
        };

        let metrics = MetricsCalculator::new().calculate(&result);
        assert_eq!(metrics.round_trips, 0);
        assert!((metrics.exposure - 0.5).abs() < 1e-12);
    }
}
