// =================================================================
// source/utils.rs - Utility Functions
// =================================================================

use super::{ChartResult, HistoryParams, SourceError};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use trading_common::data::{PricePoint, PriceSeries};

/// Validate and normalise a ticker symbol
pub fn validate_symbol(symbol: &str) -> Result<String, SourceError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(SourceError::InvalidSymbol("Symbol cannot be empty".to_string()));
    }

    let symbol = symbol.to_uppercase();

    // Tickers like BRK-B, ^GSPC, EURUSD=X, RDS.A
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
    {
        return Err(SourceError::InvalidSymbol(format!(
            "Symbol '{}' contains invalid characters",
            symbol
        )));
    }

    if symbol.len() > 20 {
        return Err(SourceError::InvalidSymbol(format!(
            "Symbol '{}' has invalid length",
            symbol
        )));
    }

    Ok(symbol)
}

/// Midnight UTC at the start of `date`
pub fn date_to_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Convert a chart API result into a price series.
///
/// Adjusted close is used where present, otherwise the plain close. Bars
/// with neither, and bars outside the requested dates, are skipped.
pub fn convert_chart_to_series(
    result: ChartResult,
    params: &HistoryParams,
) -> Result<PriceSeries, SourceError> {
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    let adjusted = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let first = date_to_utc(params.start);
    let last = date_to_utc(params.end) + chrono::Duration::days(1);

    let mut points = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &seconds) in result.timestamp.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| SourceError::ParseError(format!("Invalid timestamp {}", seconds)))?;
        if timestamp < first || timestamp >= last {
            continue;
        }

        let price = adjusted
            .get(i)
            .copied()
            .flatten()
            .or_else(|| closes.get(i).copied().flatten());

        match price {
            Some(price) if price.is_finite() && price > 0.0 => {
                points.push(PricePoint::new(timestamp, price));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} bars without a usable price for {}", skipped, params.symbol);
    }

    if points.is_empty() {
        return Err(params.no_data());
    }

    Ok(PriceSeries::new(params.symbol.clone(), points)?)
}
