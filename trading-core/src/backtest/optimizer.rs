// trading-core/src/backtest/optimizer.rs

use super::engine::final_capital;
use super::signal::SignalGenerator;
use super::sma::moving_average;
use super::types::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("No price data to optimize over")]
    NoData,

    #[error("No valid window pair (short < long) in short range {short:?} and long range {long:?}")]
    EmptyGrid { short: Vec<usize>, long: Vec<usize> },

    #[error("Invalid window range: {0}")]
    InvalidRange(String),
}

/// Inclusive range of window lengths with a step.
///
/// Parses `"5..=50"`, `"5..50"` (exclusive end), `"5-50"` and an optional
/// `":step"` suffix such as `"20..=200:10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
    #[serde(default = "default_step")]
    pub step: usize,
}

fn default_step() -> usize {
    1
}

impl WindowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, step: 1 }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn values(&self) -> Vec<usize> {
        if self.start > self.end {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step.max(1)).collect()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for WindowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.step == 1 {
            write!(f, "{}..={}", self.start, self.end)
        } else {
            write!(f, "{}..={}:{}", self.start, self.end, self.step)
        }
    }
}

impl FromStr for WindowRange {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptimizerError::InvalidRange(s.to_string());
        let parse = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());

        let (bounds, step) = match s.split_once(':') {
            Some((bounds, step)) => (bounds, parse(step)?),
            None => (s, 1),
        };

        let (start, end) = if let Some((a, b)) = bounds.split_once("..=") {
            (parse(a)?, parse(b)?)
        } else if let Some((a, b)) = bounds.split_once("..") {
            let end = parse(b)?.checked_sub(1).ok_or_else(invalid)?;
            (parse(a)?, end)
        } else if let Some((a, b)) = bounds.split_once('-') {
            (parse(a)?, parse(b)?)
        } else {
            let single = parse(bounds)?;
            (single, single)
        };

        if start == 0 || step == 0 || start > end {
            return Err(invalid());
        }

        Ok(Self { start, end, step })
    }
}

/// Receives progress notifications during a sweep. Never affects the result.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_trial(&self, completed: usize, total: usize);

    fn on_finish(&self, _result: &OptimizationResult) {}
}

pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_trial(&self, _completed: usize, _total: usize) {}
}

/// Logs progress every `every` trials
pub struct LoggingObserver {
    every: usize,
}

impl LoggingObserver {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ProgressObserver for LoggingObserver {
    fn on_start(&self, total: usize) {
        info!("Evaluating {} window pairs", total);
    }

    fn on_trial(&self, completed: usize, total: usize) {
        if completed % self.every == 0 || completed == total {
            info!(
                "Optimizer progress: {}/{} ({:.1}%)",
                completed,
                total,
                completed as f64 / total as f64 * 100.0
            );
        }
    }

    fn on_finish(&self, result: &OptimizationResult) {
        info!(
            "Best window pair {} with final capital {:.2}",
            result.best_window, result.best_profit
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub initial_capital: f64,
    pub use_confirmation: bool,
    /// Run trials on the rayon thread pool
    pub parallel: bool,
    /// Size of the leaderboard kept in the result
    pub top_n: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            use_confirmation: true,
            parallel: true,
            top_n: 10,
        }
    }
}

/// `true` when `a` beats `b`: higher capital, then earlier enumeration
fn outranks(a: &TrialResult, b: &TrialResult) -> bool {
    match a.final_capital.total_cmp(&b.final_capital) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.ordinal < b.ordinal,
    }
}

fn rank(a: &TrialResult, b: &TrialResult) -> Ordering {
    b.final_capital
        .total_cmp(&a.final_capital)
        .then(a.ordinal.cmp(&b.ordinal))
}

fn ascending(values: &[usize]) -> Vec<usize> {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();
    values
}

/// Exhaustive grid search over short/long window pairs
pub struct ParameterOptimizer {
    config: OptimizerConfig,
}

impl ParameterOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Window pairs in enumeration order: short outer, long inner, both
    /// ascending and deduplicated, invalid pairs (`short >= long` or zero)
    /// skipped
    pub fn grid(short_range: &[usize], long_range: &[usize]) -> Vec<WindowConfig> {
        let short = ascending(short_range);
        let long = ascending(long_range);

        short
            .iter()
            .flat_map(|&s| long.iter().map(move |&l| WindowConfig::new(s, l)))
            .filter(WindowConfig::is_ordered)
            .collect()
    }

    pub fn optimize(
        &self,
        prices: &[f64],
        short_range: &[usize],
        long_range: &[usize],
        observer: &dyn ProgressObserver,
    ) -> Result<OptimizationResult, OptimizerError> {
        if prices.is_empty() {
            return Err(OptimizerError::NoData);
        }

        let grid = Self::grid(short_range, long_range);
        if grid.is_empty() {
            return Err(OptimizerError::EmptyGrid {
                short: short_range.to_vec(),
                long: long_range.to_vec(),
            });
        }

        let total = grid.len();
        let started = Instant::now();
        observer.on_start(total);

        // Averages depend only on (prices, window); computed once, shared read-only
        let averages = self.average_table(prices, &grid);
        let generator = SignalGenerator::new(self.config.use_confirmation);
        let completed = AtomicUsize::new(0);

        let evaluate = |(ordinal, window): (usize, &WindowConfig)| {
            let signals = generator.generate(
                &averages[&window.short_window],
                &averages[&window.long_window],
            );
            let trial = TrialResult {
                ordinal,
                window: *window,
                final_capital: final_capital(prices, &signals.confirmed, self.config.initial_capital),
            };
            let done = completed.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            observer.on_trial(done, total);
            trial
        };

        let trials: Vec<TrialResult> = if self.config.parallel {
            grid.par_iter().enumerate().map(evaluate).collect()
        } else {
            grid.iter().enumerate().map(evaluate).collect()
        };

        let result = self.reduce(trials)?;

        debug!(
            "Evaluated {} window pairs in {:?}",
            result.evaluated,
            started.elapsed()
        );
        observer.on_finish(&result);

        Ok(result)
    }

    fn average_table(&self, prices: &[f64], grid: &[WindowConfig]) -> HashMap<usize, Vec<Option<f64>>> {
        let mut windows: Vec<usize> = grid
            .iter()
            .flat_map(|w| [w.short_window, w.long_window])
            .collect();
        windows.sort_unstable();
        windows.dedup();

        if self.config.parallel {
            windows
                .par_iter()
                .map(|&w| (w, moving_average(prices, w)))
                .collect()
        } else {
            windows
                .iter()
                .map(|&w| (w, moving_average(prices, w)))
                .collect()
        }
    }

    /// Max-with-first-wins over independent trial results
    fn reduce(&self, trials: Vec<TrialResult>) -> Result<OptimizationResult, OptimizerError> {
        let best = trials
            .iter()
            .copied()
            .reduce(|best, trial| if outranks(&trial, &best) { trial } else { best })
            .ok_or(OptimizerError::NoData)?;

        let mut leaderboard = trials.clone();
        leaderboard.sort_by(rank);
        leaderboard.truncate(self.config.top_n.max(1));

        Ok(OptimizationResult {
            best_window: best.window,
            best_profit: best.final_capital,
            evaluated: trials.len(),
            leaderboard,
        })
    }
}

impl Default for ParameterOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}
