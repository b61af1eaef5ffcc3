use std::sync::Arc;

use serde::Deserialize;

use crate::data_source::{SourceError, SourceFuture, StockBarSource};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{Period, StockBar, Symbol, UtcDateTime};

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const PROVIDER: &str = "yahoo";

/// Daily bars from the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooChartAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl Default for YahooChartAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooChartAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_YAHOO_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, ticker: &Symbol, period: Period) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url,
            urlencoding::encode(ticker.as_str()),
            period.as_str()
        )
    }

    async fn fetch_bars(&self, ticker: &Symbol, period: Period) -> Result<Vec<StockBar>, SourceError> {
        let request = HttpRequest::get(self.chart_url(ticker, period))
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(10_000);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_transport(PROVIDER, &error))?;

        if !response.is_success() {
            // A 404 carries a chart error naming the unknown ticker.
            if response.status == 404 {
                if let Ok(chart) = serde_json::from_str::<YahooChartResponse>(&response.body) {
                    if let Some(error) = chart.chart.error {
                        return Err(SourceError::upstream(error.describe()));
                    }
                }
            }
            return Err(SourceError::from_status(PROVIDER, &response));
        }

        parse_chart(ticker, &response.body)
    }
}

impl StockBarSource for YahooChartAdapter {
    fn daily_bars<'a>(&'a self, ticker: &'a Symbol, period: Period) -> SourceFuture<'a, Vec<StockBar>> {
        Box::pin(async move { self.fetch_bars(ticker, period).await })
    }
}

/// Rows missing any OHLC value are dropped; a missing volume becomes zero.
fn parse_chart(ticker: &Symbol, body: &str) -> Result<Vec<StockBar>, SourceError> {
    let chart: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error {
        return Err(SourceError::upstream(error.describe()));
    }

    let Some(result) = chart.chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::malformed("yahoo chart has timestamps but no quote block"))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (index, seconds) in timestamps.into_iter().enumerate() {
        let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
            quote.open.get(index),
            quote.high.get(index),
            quote.low.get(index),
            quote.close.get(index),
        ) else {
            continue;
        };
        let volume = quote
            .volume
            .get(index)
            .copied()
            .flatten()
            .map_or(0, |volume| u64::try_from(volume.max(0)).unwrap_or_default());

        let date = UtcDateTime::from_unix_seconds(seconds)
            .map_err(|e| SourceError::malformed(e.to_string()))?
            .date();
        if let Ok(bar) = StockBar::new(ticker.clone(), date, *open, *high, *low, *close, volume) {
            bars.push(bar);
        }
    }

    Ok(bars)
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: Option<String>,
    description: Option<String>,
}

impl YahooChartError {
    fn describe(&self) -> String {
        format!(
            "yahoo chart error {}: {}",
            self.code.as_deref().unwrap_or("unknown"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
