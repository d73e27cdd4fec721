// source/traits.rs

use super::{HistoryParams, SourceError};
use async_trait::async_trait;
use trading_common::data::PriceSeries;

/// Supplies historical prices for a symbol over a closed date range
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short identifier used in logs and cache keys
    fn name(&self) -> &str;

    /// Fetch daily prices for `params.symbol` between `params.start` and
    /// `params.end`, both inclusive.
    ///
    /// Returns [`SourceError::NoData`] rather than an empty series when the
    /// source has nothing for the request.
    async fn fetch_history(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError>;
}
