use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use trading_common::data::{PriceSeries, PriceSeriesCache, SeriesKey};

use super::{
    BacktestReport, BacktestRequest, CapitalSummary, OptimizationReport, OptimizeRequest,
    RetryConfig, ServiceError,
};
use crate::backtest::{
    MetricsCalculator, OptimizerConfig, ParameterOptimizer, ProgressObserver, StrategyPipeline,
    WindowConfig,
};
use crate::config::Settings;
use crate::source::{HistoryParams, PriceSource};

/// Fetches price history and runs backtests or sweeps over it
pub struct BacktestService {
    source: Arc<dyn PriceSource>,
    cache: PriceSeriesCache,
    settings: Settings,
    retry: RetryConfig,
}

impl BacktestService {
    pub fn new(source: Arc<dyn PriceSource>, settings: Settings) -> Self {
        Self {
            cache: PriceSeriesCache::new(settings.source.cache_capacity),
            source,
            settings,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Cached series for the range, fetching it on a miss
    pub async fn load_series(
        &self,
        symbol: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<Arc<PriceSeries>, ServiceError> {
        let params = HistoryParams::new(symbol, start, end);
        params.validate()?;

        let key = SeriesKey::new(self.source.name(), &params.symbol, start, end);
        if let Some(series) = self.cache.get(&key).await {
            return Ok(series);
        }

        let series = self.fetch_with_retry(&params).await.map_err(|e| {
            error!(
                "Failed to load {} from {}: {}",
                params.symbol,
                self.source.name(),
                e
            );
            e
        })?;

        series.ensure_not_empty()?;

        Ok(self.cache.insert(key, series).await)
    }

    async fn fetch_with_retry(&self, params: &HistoryParams) -> Result<PriceSeries, ServiceError> {
        let mut attempt = 0;

        loop {
            match self.source.fetch_history(params).await {
                Ok(series) => {
                    debug!("Loaded {} prices for {}", series.len(), params.symbol);
                    return Ok(series);
                }
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    warn!(
                        "Fetch for {} failed (attempt {}/{}): {}",
                        params.symbol, attempt, self.retry.max_retry_attempts, e
                    );

                    if attempt >= self.retry.max_retry_attempts {
                        return Err(ServiceError::RetryLimitExceeded(format!(
                            "{} after {} attempts: {}",
                            params.symbol, attempt, e
                        )));
                    }

                    sleep(Duration::from_millis(self.retry.retry_delay_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run a single backtest, filling unset request fields from configuration
    pub async fn run_backtest(&self, request: BacktestRequest) -> Result<BacktestReport, ServiceError> {
        let windows = request
            .windows
            .unwrap_or_else(|| self.settings.controls.default_windows());
        self.settings
            .controls
            .validate(&windows)
            .map_err(ServiceError::Validation)?;

        let initial_capital = request
            .initial_capital
            .unwrap_or(self.settings.strategy.initial_capital);
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "Initial capital must be positive, got {}",
                initial_capital
            )));
        }
        let use_confirmation = request
            .use_confirmation
            .unwrap_or(self.settings.strategy.use_confirmation);

        let series = self
            .load_series(&request.symbol, request.start, request.end)
            .await?;

        let config = self
            .settings
            .pipeline_config(windows)
            .with_initial_capital(initial_capital)
            .with_confirmation(use_confirmation);
        let output = StrategyPipeline::new(config).run(series.prices());
        let metrics = MetricsCalculator::new().calculate(&output.result);

        info!(
            "Backtest {} {}: final capital {:.2} ({} trades)",
            series.symbol(),
            windows,
            output.result.final_capital,
            output.result.trades.len()
        );

        Ok(BacktestReport::new(
            self.source.name(),
            &request,
            &series,
            output,
            windows,
            use_confirmation,
            metrics,
        ))
    }

    /// Grid sweep on the blocking pool so the runtime stays responsive
    pub async fn optimize(
        &self,
        request: OptimizeRequest,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<OptimizationReport, ServiceError> {
        let short_range = request
            .short_range
            .unwrap_or(self.settings.optimizer.short_range);
        let long_range = request
            .long_range
            .unwrap_or(self.settings.optimizer.long_range);

        let config = OptimizerConfig {
            parallel: request.parallel.unwrap_or(self.settings.optimizer.parallel),
            top_n: request.top_n.unwrap_or(self.settings.optimizer.top_n),
            ..self.settings.optimizer_config()
        };

        let series = self
            .load_series(&request.symbol, request.start, request.end)
            .await?;
        let observations = series.len();

        info!(
            "Optimizing {} over {} prices: short {} x long {} ({})",
            series.symbol(),
            observations,
            short_range,
            long_range,
            if config.parallel { "parallel" } else { "sequential" }
        );

        let started = Instant::now();
        let sweep_series = Arc::clone(&series);
        let result = tokio::task::spawn_blocking(move || {
            ParameterOptimizer::new(config).optimize(
                sweep_series.prices(),
                &short_range.values(),
                &long_range.values(),
                observer.as_ref(),
            )
        })
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
        .map_err(|e| {
            error!("Optimization of {} failed: {}", series.symbol(), e);
            ServiceError::from(e)
        })?;

        Ok(OptimizationReport {
            symbol: series.symbol().to_string(),
            source: self.source.name().to_string(),
            start: request.start,
            end: request.end,
            observations,
            short_range,
            long_range,
            evaluated: result.evaluated,
            best_window: result.best_window,
            best_profit: result.best_profit,
            summary: CapitalSummary::new(config.initial_capital, result.best_profit),
            leaderboard: result.leaderboard,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Default windows from the interactive controls
    pub fn default_windows(&self) -> WindowConfig {
        self.settings.controls.default_windows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{NoopObserver, WindowRange};
    use crate::source::{SourceError, SyntheticSource};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trading_common::data::DataError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn synthetic_service() -> BacktestService {
        BacktestService::new(Arc::new(SyntheticSource::new(11)), Settings::default())
    }

    fn request(windows: Option<WindowConfig>) -> BacktestRequest {
        BacktestRequest {
            symbol: "tsla".to_string(),
            start: date(2023, 1, 1),
            end: date(2023, 12, 31),
            windows,
            ..Default::default()
        }
    }

    /// Fails with a timeout a fixed number of times, then serves a series
    struct FlakySource {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_history(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SourceError::Timeout);
            }
            SyntheticSource::default().fetch_history(params).await
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retry_attempts: 3,
            retry_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_backtest_report_shapes() {
        let service = synthetic_service();
        let report = service.run_backtest(request(None)).await.unwrap();

        let n = report.prices.len();
        assert_eq!(n, 365);
        assert_eq!(report.symbol, "TSLA");
        assert_eq!(report.source, "synthetic");
        assert_eq!(report.windows, WindowConfig::new(5, 20));
        assert_eq!(report.timestamps.len(), n);
        assert_eq!(report.short_ma.len(), n);
        assert_eq!(report.long_ma.len(), n);
        assert_eq!(report.signals.len(), n);
        assert_eq!(report.equity_curve.len(), n);
        assert!(report.long_ma[..19].iter().all(Option::is_none));
        assert!(report.trades.iter().all(|t| t.timestamp.is_some()));
        assert_eq!(report.metrics.total_trades as usize, report.trades.len());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["windows"]["short_window"], 5);
    }

    #[tokio::test]
    async fn test_out_of_bounds_windows_rejected() {
        let service = synthetic_service();

        let err = service
            .run_backtest(request(Some(WindowConfig::new(5, 80))))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .run_backtest(BacktestRequest {
                initial_capital: Some(0.0),
                ..request(None)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_inverted_windows_keep_capital() {
        let service = synthetic_service();
        let report = service
            .run_backtest(request(Some(WindowConfig::new(15, 12))))
            .await
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(report.final_capital, 10_000.0);
    }

    #[tokio::test]
    async fn test_series_is_cached() {
        let source = Arc::new(FlakySource {
            failures: 0,
            calls: AtomicUsize::new(0),
        });
        let service = BacktestService::new(source.clone(), Settings::default());

        service.run_backtest(request(None)).await.unwrap();
        service
            .run_backtest(request(Some(WindowConfig::new(3, 30))))
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let source = Arc::new(FlakySource {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let service =
            BacktestService::new(source.clone(), Settings::default()).with_retry(fast_retry());

        assert!(service.run_backtest(request(None)).await.is_ok());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_limit() {
        let source = Arc::new(FlakySource {
            failures: 10,
            calls: AtomicUsize::new(0),
        });
        let service =
            BacktestService::new(source.clone(), Settings::default()).with_retry(fast_retry());

        let err = service.run_backtest(request(None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::RetryLimitExceeded(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_range_is_not_retried() {
        let service = synthetic_service();
        let err = service
            .run_backtest(BacktestRequest {
                start: date(2024, 1, 1),
                end: date(2023, 1, 1),
                ..request(None)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Source(SourceError::InvalidRange { .. })
        ));
        assert!(!err.is_recoverable());
    }

    /// Answers every request with an empty series
    struct EmptySource;

    #[async_trait]
    impl PriceSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch_history(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
            Ok(PriceSeries::empty(params.symbol.clone()))
        }
    }

    #[tokio::test]
    async fn test_empty_series_is_no_data() {
        let service = BacktestService::new(Arc::new(EmptySource), Settings::default());

        let err = service.run_backtest(request(None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Data(DataError::Empty(ref s)) if s == "TSLA"));
        assert!(err.is_no_data());

        // Empty series are never cached
        assert!(service
            .optimize(
                OptimizeRequest {
                    symbol: "tsla".to_string(),
                    start: date(2023, 1, 1),
                    end: date(2023, 12, 31),
                    ..Default::default()
                },
                Arc::new(NoopObserver),
            )
            .await
            .unwrap_err()
            .is_no_data());
    }

    #[tokio::test]
    async fn test_optimize_matches_sequential() {
        let service = synthetic_service();
        let base = OptimizeRequest {
            symbol: "SPY".to_string(),
            start: date(2022, 1, 1),
            end: date(2023, 6, 30),
            short_range: Some(WindowRange::new(2, 12)),
            long_range: Some(WindowRange::new(10, 40).with_step(3)),
            top_n: Some(5),
            ..Default::default()
        };

        let parallel = service
            .optimize(base.clone(), Arc::new(NoopObserver))
            .await
            .unwrap();
        let sequential = service
            .optimize(
                OptimizeRequest {
                    parallel: Some(false),
                    ..base
                },
                Arc::new(NoopObserver),
            )
            .await
            .unwrap();

        assert_eq!(parallel.best_window, sequential.best_window);
        assert_eq!(parallel.best_profit, sequential.best_profit);
        assert_eq!(parallel.leaderboard, sequential.leaderboard);
        assert_eq!(parallel.leaderboard.len(), 5);
        assert_eq!(parallel.leaderboard[0].final_capital, parallel.best_profit);
        assert!(parallel.best_window.is_ordered());
    }

    #[tokio::test]
    async fn test_optimize_empty_grid() {
        let service = synthetic_service();
        let err = service
            .optimize(
                OptimizeRequest {
                    symbol: "SPY".to_string(),
                    start: date(2023, 1, 1),
                    end: date(2023, 3, 1),
                    short_range: Some(WindowRange::new(30, 40)),
                    long_range: Some(WindowRange::new(10, 20)),
                    ..Default::default()
                },
                Arc::new(NoopObserver),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Optimizer(_)));
    }
}
