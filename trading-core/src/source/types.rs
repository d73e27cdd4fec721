// =================================================================
// source/types.rs - Data Structures
// =================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::SourceError;

/// Parameters for querying price history over a closed date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryParams {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryParams {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        if self.start > self.end {
            return Err(SourceError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn no_data(&self) -> SourceError {
        SourceError::NoData {
            symbol: self.symbol.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Which collaborator supplies prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    /// Seeded random walk, no network access
    Synthetic,
    /// Remote chart API
    #[default]
    External,
}

impl fmt::Display for PriceSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceKind::Synthetic => write!(f, "synthetic"),
            PriceSourceKind::External => write!(f, "external"),
        }
    }
}

/// Yahoo chart API envelope
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Bar open times in unix seconds
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
    #[serde(default)]
    pub adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartAdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}
