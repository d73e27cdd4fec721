// =================================================================
// source/synthetic.rs - Seeded Random Walk
// =================================================================

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trading_common::data::{PricePoint, PriceSeries};

use super::{
    errors::SourceError,
    traits::PriceSource,
    types::HistoryParams,
    utils::{date_to_utc, validate_symbol},
};

/// Offline price source producing one close per calendar day.
///
/// The same seed, symbol and date range always yield the same series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSource {
    pub seed: u64,
    pub initial_price: f64,
    /// Mean daily return
    pub drift: f64,
    /// Half-width of the uniform daily return shock
    pub volatility: f64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        // FNV-1a over the symbol so each ticker walks its own path
        let mixed = symbol.bytes().fold(self.seed ^ 0xcbf2_9ce4_8422_2325, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        StdRng::seed_from_u64(mixed)
    }

    pub fn generate(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
        params.validate()?;

        let mut rng = self.rng_for(&params.symbol);
        let mut price = self.initial_price;
        let mut points = Vec::new();

        for date in params.start.iter_days().take_while(|d| *d <= params.end) {
            points.push(PricePoint::new(date_to_utc(date), price));

            let shock = if self.volatility > 0.0 {
                rng.gen_range(-self.volatility..self.volatility)
            } else {
                0.0
            };
            price *= (1.0 + self.drift + shock).max(0.01);
        }

        debug!(
            "Generated {} synthetic closes for {} with seed {}",
            points.len(),
            params.symbol,
            self.seed
        );

        Ok(PriceSeries::new(params.symbol.clone(), points)?)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            seed: 42,
            initial_price: 100.0,
            drift: 0.0003,
            volatility: 0.02,
        }
    }
}

#[async_trait]
impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch_history(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
        let params = HistoryParams {
            symbol: validate_symbol(&params.symbol)?,
            ..params.clone()
        };
        self.generate(&params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(symbol: &str) -> HistoryParams {
        HistoryParams::new(
            symbol,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_deterministic_for_seed() {
        let source = SyntheticSource::new(7);

        let first = source.fetch_history(&params("TSLA")).await.unwrap();
        let second = source.fetch_history(&params("tsla")).await.unwrap();

        assert_eq!(first, second);
        // 2024 is a leap year
        assert_eq!(first.len(), 366);
        assert_eq!(first.prices()[0], 100.0);
        assert!(first.prices().iter().all(|p| *p > 0.0));
    }

    #[tokio::test]
    async fn test_symbol_and_seed_change_the_path() {
        let source = SyntheticSource::new(7);
        let tsla = source.fetch_history(&params("TSLA")).await.unwrap();
        let aapl = source.fetch_history(&params("AAPL")).await.unwrap();
        let reseeded = SyntheticSource::new(8)
            .fetch_history(&params("TSLA"))
            .await
            .unwrap();

        assert_ne!(tsla.prices(), aapl.prices());
        assert_ne!(tsla.prices(), reseeded.prices());
    }

    #[tokio::test]
    async fn test_single_day_and_inverted_range() {
        let source = SyntheticSource::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let single = source
            .fetch_history(&HistoryParams::new("SPY", day, day))
            .await
            .unwrap();
        assert_eq!(single.len(), 1);

        let inverted = HistoryParams::new("SPY", day, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(matches!(
            source.fetch_history(&inverted).await,
            Err(SourceError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_zero_volatility_is_pure_drift() {
        let source = SyntheticSource {
            volatility: 0.0,
            drift: 0.01,
            ..SyntheticSource::default()
        };
        let series = source.generate(&params("SPY")).unwrap();

        assert!(series.prices().windows(2).all(|w| w[1] > w[0]));
        assert!((series.prices()[1] - 101.0).abs() < 1e-9);
    }
}
