// trading-core/src/backtest/pipeline.rs

use super::engine::{final_capital, BacktestEngine};
use super::signal::{SignalGenerator, SignalSeries};
use super::sma::MovingAverages;
use super::types::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Parameters of one moving-average crossover run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub windows: WindowConfig,
    pub initial_capital: f64,
    /// Act only on regime changes instead of on every raw signal
    pub use_confirmation: bool,
}

impl PipelineConfig {
    pub fn new(windows: WindowConfig) -> Self {
        Self {
            windows,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            use_confirmation: true,
        }
    }

    pub fn with_initial_capital(mut self, initial_capital: f64) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    pub fn with_confirmation(mut self, use_confirmation: bool) -> Self {
        self.use_confirmation = use_confirmation;
        self
    }
}

/// Everything derived from one run, kept for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub averages: MovingAverages,
    pub signals: SignalSeries,
    pub result: BacktestResult,
}

/// Moving averages, signals and simulation wired together
#[derive(Debug, Clone, Copy)]
pub struct StrategyPipeline {
    config: PipelineConfig,
}

impl StrategyPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, prices: &[f64]) -> PipelineOutput {
        if !self.config.windows.is_ordered() {
            warn!(
                "{} is not ordered short < long; treating every index as flat",
                self.config.windows
            );
        }

        let averages = MovingAverages::compute(prices, &self.config.windows);
        let signals = self.signals(&averages);
        let result = BacktestEngine::new(self.config.initial_capital).run(prices, &signals.confirmed);

        PipelineOutput {
            averages,
            signals,
            result,
        }
    }

    fn signals(&self, averages: &MovingAverages) -> SignalSeries {
        if self.config.windows.is_ordered() {
            SignalGenerator::new(self.config.use_confirmation).from_averages(averages)
        } else {
            SignalSeries::always_flat(averages)
        }
    }

    /// Final capital only, without recording trades or equity
    pub fn evaluate(&self, prices: &[f64]) -> f64 {
        let averages = MovingAverages::compute(prices, &self.config.windows);
        let signals = self.signals(&averages);
        final_capital(prices, &signals.confirmed, self.config.initial_capital)
    }
}
