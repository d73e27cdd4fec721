// =================================================================
// source/yahoo.rs - Yahoo Finance Chart API
// =================================================================

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};
use trading_common::data::PriceSeries;

use super::{
    errors::SourceError,
    traits::PriceSource,
    types::{ChartResponse, HistoryParams},
    utils::{convert_chart_to_series, date_to_utc, validate_symbol},
};

// Constants
const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; ma-cross/0.1)";

/// Daily adjusted closes from the Yahoo Finance chart endpoint
pub struct YahooSource {
    api_url: String,
    client: reqwest::Client,
}

impl YahooSource {
    pub fn new() -> Self {
        Self::with_api_url(YAHOO_API_URL)
    }

    /// Point at another host serving the same chart API
    pub fn with_api_url(api_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn chart_url(&self, params: &HistoryParams) -> String {
        // period2 is exclusive, so extend one day past the requested end
        let period1 = date_to_utc(params.start).timestamp();
        let period2 = (date_to_utc(params.end) + chrono::Duration::days(1)).timestamp();

        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.api_url, params.symbol, period1, period2
        )
    }

    /// Parse a chart API body into a price series
    fn parse_chart(&self, body: &str, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
        let response: ChartResponse = serde_json::from_str(body)?;

        if let Some(error) = response.chart.error {
            // Unknown and delisted tickers both come back as "Not Found"
            if error.code == "Not Found" {
                return Err(params.no_data());
            }
            return Err(SourceError::ApiError(format!(
                "{}: {}",
                error.code,
                error.description.unwrap_or_default()
            )));
        }

        let result = response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| params.no_data())?;

        convert_chart_to_series(result, params)
    }

    async fn fetch_chart(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
        let url = self.chart_url(params);
        debug!("Fetching price history from: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimit(format!("HTTP {}", status)));
        }

        // A 404 still carries a chart error body naming the problem
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SourceError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let series = self.parse_chart(&body, params)?;

        info!(
            "Fetched {} daily closes for {} ({} to {})",
            series.len(),
            params.symbol,
            params.start,
            params.end
        );
        Ok(series)
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_history(&self, params: &HistoryParams) -> Result<PriceSeries, SourceError> {
        params.validate()?;
        let params = HistoryParams {
            symbol: validate_symbol(&params.symbol)?,
            ..params.clone()
        };

        self.fetch_chart(&params).await
    }
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params() -> HistoryParams {
        HistoryParams::new(
            "TSLA",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
    }

    #[test]
    fn test_chart_url() {
        let source = YahooSource::with_api_url("http://localhost:8080/");
        let url = source.chart_url(&params());

        assert_eq!(
            url,
            "http://localhost:8080/v8/finance/chart/TSLA?period1=1704153600&period2=1704499200&interval=1d&events=history"
        );
    }

    #[test]
    fn test_parse_chart() {
        let source = YahooSource::new();
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"TSLA","currency":"USD"},
            "timestamp":[1704205800,1704292200],
            "indicators":{
                "quote":[{"open":[250.0,244.0],"close":[248.42,238.45]}],
                "adjclose":[{"adjclose":[248.42,238.45]}]
            }
        }],"error":null}}"#;

        let series = source.parse_chart(body, &params()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().price, 238.45);
    }

    #[test]
    fn test_parse_not_found() {
        let source = YahooSource::new();
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

        let err = source.parse_chart(body, &params()).unwrap_err();
        assert!(err.is_no_data());
        assert!(matches!(err, SourceError::NoData { ref symbol, .. } if symbol == "TSLA"));
    }

    #[test]
    fn test_parse_api_error_and_garbage() {
        let source = YahooSource::new();
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(
            source.parse_chart(body, &params()),
            Err(SourceError::ApiError(_))
        ));

        assert!(matches!(
            source.parse_chart("<html>", &params()),
            Err(SourceError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_missing_result_is_no_data() {
        let source = YahooSource::new();
        let body = r#"{"chart":{"result":[],"error":null}}"#;

        assert!(source.parse_chart(body, &params()).unwrap_err().is_no_data());
    }

    #[tokio::test]
    async fn test_rejects_bad_request_before_network() {
        let source = YahooSource::with_api_url("http://127.0.0.1:9");

        let inverted = HistoryParams::new(
            "TSLA",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(matches!(
            source.fetch_history(&inverted).await,
            Err(SourceError::InvalidRange { .. })
        ));

        let bad_symbol = HistoryParams::new("TS LA", inverted.end, inverted.start);
        assert!(matches!(
            source.fetch_history(&bad_symbol).await,
            Err(SourceError::InvalidSymbol(_))
        ));
    }
}
