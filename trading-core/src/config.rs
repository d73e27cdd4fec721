use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};
use std::path::Path;

use crate::backtest::{OptimizerConfig, PipelineConfig, WindowConfig, WindowRange, DEFAULT_INITIAL_CAPITAL};
use crate::source::PriceSourceKind;

const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: PriceSourceKind,
    pub api_url: String,
    /// Seed for the synthetic random walk
    pub seed: u64,
    /// Number of fetched series kept in memory
    pub cache_capacity: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: PriceSourceKind::External,
            api_url: DEFAULT_YAHOO_URL.to_string(),
            seed: 42,
            cache_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub initial_capital: f64,
    pub use_confirmation: bool,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            use_confirmation: true,
        }
    }
}

/// Allowed window values for an interactive backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBounds {
    pub short_min: usize,
    pub short_max: usize,
    pub short_default: usize,
    pub long_min: usize,
    pub long_max: usize,
    pub long_default: usize,
}

impl ControlBounds {
    pub fn default_windows(&self) -> WindowConfig {
        WindowConfig::new(self.short_default, self.long_default)
    }

    /// Check both windows are positive and inside their bounds.
    /// `short >= long` is allowed here; the engine treats it as always flat.
    pub fn validate(&self, windows: &WindowConfig) -> Result<(), String> {
        if windows.short_window == 0 || windows.long_window == 0 {
            return Err("Window lengths must be positive".to_string());
        }
        if !(self.short_min..=self.short_max).contains(&windows.short_window) {
            return Err(format!(
                "Short window {} outside {}..={}",
                windows.short_window, self.short_min, self.short_max
            ));
        }
        if !(self.long_min..=self.long_max).contains(&windows.long_window) {
            return Err(format!(
                "Long window {} outside {}..={}",
                windows.long_window, self.long_min, self.long_max
            ));
        }
        Ok(())
    }
}

impl Default for ControlBounds {
    fn default() -> Self {
        Self {
            short_min: 2,
            short_max: 20,
            short_default: 5,
            long_min: 10,
            long_max: 50,
            long_default: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub short_range: WindowRange,
    pub long_range: WindowRange,
    pub parallel: bool,
    pub top_n: usize,
    /// Log progress every this many trials
    pub progress_every: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            short_range: WindowRange::new(5, 50),
            long_range: WindowRange::new(20, 200),
            parallel: true,
            top_n: 10,
            progress_every: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub strategy: StrategySettings,
    pub controls: ControlBounds,
    pub optimizer: OptimizerSettings,
}

impl Settings {
    /// Load `config/default`, then `config/{RUN_MODE}`, then `APP__*` variables.
    /// `CONFIG_DIR` moves the config directory.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());
        Self::load(Path::new(&config_dir), Environment::with_prefix("APP"))
    }

    pub fn load(config_dir: &Path, env: Environment) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(&run_mode)).required(false))
            .add_source(env.separator("__").try_parsing(true))
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Message(msg));

        if !self.strategy.initial_capital.is_finite() || self.strategy.initial_capital <= 0.0 {
            return invalid(format!(
                "strategy.initial_capital must be positive, got {}",
                self.strategy.initial_capital
            ));
        }
        let c = &self.controls;
        if c.short_min == 0 || c.short_min > c.short_max || c.long_min == 0 || c.long_min > c.long_max {
            return invalid("controls bounds must be positive and ordered".to_string());
        }
        if let Err(e) = c.validate(&c.default_windows()) {
            return invalid(format!("controls defaults: {}", e));
        }
        Ok(())
    }

    pub fn pipeline_config(&self, windows: WindowConfig) -> PipelineConfig {
        PipelineConfig::new(windows)
            .with_initial_capital(self.strategy.initial_capital)
            .with_confirmation(self.strategy.use_confirmation)
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            initial_capital: self.strategy.initial_capital,
            use_confirmation: self.strategy.use_confirmation,
            parallel: self.optimizer.parallel,
            top_n: self.optimizer.top_n,
        }
    }
}
