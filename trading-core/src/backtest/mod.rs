pub mod engine;
pub mod metrics;
pub mod optimizer;
pub mod pipeline;
pub mod signal;
pub mod sma;
pub mod types;

pub use engine::{final_capital, BacktestEngine, PositionState};
pub use metrics::{Metrics, MetricsCalculator};
pub use optimizer::{
    LoggingObserver, NoopObserver, OptimizerConfig, OptimizerError, ParameterOptimizer,
    ProgressObserver, WindowRange,
};
pub use pipeline::{PipelineConfig, PipelineOutput, StrategyPipeline};
pub use signal::{SignalGenerator, SignalSeries};
pub use sma::{moving_average, MovingAverages};
pub use types::*;
