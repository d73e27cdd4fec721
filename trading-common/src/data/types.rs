use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or validating a price series
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Invalid price {price} at {timestamp}: prices must be positive and finite")]
    InvalidPrice {
        timestamp: DateTime<Utc>,
        price: f64,
    },

    #[error("Timestamps must be strictly increasing: {previous} is followed by {current}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("No price data for {0}")]
    Empty(String),
}

/// A single observation of the instrument price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Ordered, validated price history for one symbol.
///
/// The series is immutable once constructed: timestamps are strictly
/// increasing and every price is positive and finite. Consumers borrow the
/// price column through [`PriceSeries::prices`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    timestamps: Vec<DateTime<Utc>>,
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Build a series from points, rejecting unordered timestamps and
    /// non-positive prices.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, DataError> {
        let mut timestamps = Vec::with_capacity(points.len());
        let mut prices = Vec::with_capacity(points.len());

        for point in points {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(DataError::InvalidPrice {
                    timestamp: point.timestamp,
                    price: point.price,
                });
            }

            if let Some(&previous) = timestamps.last() {
                if point.timestamp <= previous {
                    return Err(DataError::OutOfOrder {
                        previous,
                        current: point.timestamp,
                    });
                }
            }

            timestamps.push(point.timestamp);
            prices.push(point.price);
        }

        Ok(Self {
            symbol: symbol.into(),
            timestamps,
            prices,
        })
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamps: Vec::new(),
            prices: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Read-only view of the price column
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last(&self) -> Option<PricePoint> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn get(&self, index: usize) -> Option<PricePoint> {
        Some(PricePoint::new(
            *self.timestamps.get(index)?,
            *self.prices.get(index)?,
        ))
    }

    /// Error out with [`DataError::Empty`] when there is nothing to trade on
    pub fn ensure_not_empty(&self) -> Result<&Self, DataError> {
        if self.is_empty() {
            Err(DataError::Empty(self.symbol.clone()))
        } else {
            Ok(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn test_series_keeps_order_and_prices() {
        let series = PriceSeries::new(
            "TSLA",
            vec![PricePoint::new(day(0), 100.0), PricePoint::new(day(1), 101.5)],
        )
        .unwrap();

        assert_eq!(series.symbol(), "TSLA");
        assert_eq!(series.prices(), &[100.0, 101.5]);
        assert_eq!(series.last().unwrap().timestamp, day(1));
        assert_eq!(series.get(0).unwrap().price, 100.0);
        assert!(series.get(2).is_none());
    }

    #[test]
    fn test_rejects_out_of_order_timestamps() {
        let result = PriceSeries::new(
            "TSLA",
            vec![PricePoint::new(day(1), 100.0), PricePoint::new(day(1), 101.0)],
        );

        assert!(matches!(result, Err(DataError::OutOfOrder { .. })));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        assert!(matches!(
            PriceSeries::new("TSLA", vec![PricePoint::new(day(0), 0.0)]),
            Err(DataError::InvalidPrice { .. })
        ));
        assert!(matches!(
            PriceSeries::new("TSLA", vec![PricePoint::new(day(0), f64::NAN)]),
            Err(DataError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_empty_series_reports_no_data() {
        let series = PriceSeries::empty("AAPL");
        assert!(series.is_empty());
        assert!(series.last().is_none());
        assert_eq!(
            series.ensure_not_empty().unwrap_err(),
            DataError::Empty("AAPL".to_string())
        );
    }

    #[test]
    fn test_series_json_shape() {
        let series = PriceSeries::new("SPY", vec![PricePoint::new(day(0), 470.25)]).unwrap();
        let json = serde_json::to_value(&series).unwrap();

        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["prices"][0], 470.25);
        assert_eq!(json["timestamps"][0], "2024-01-01T00:00:00Z");
    }
}
