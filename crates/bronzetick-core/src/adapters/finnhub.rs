use std::sync::Arc;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::data_source::{DateWindow, InsiderSource, SourceError, SourceFuture};
use crate::domain::{format_date, parse_date};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{InsiderTransaction, Symbol};

pub const DEFAULT_FINNHUB_BASE_URL: &str = "https://finnhub.io";
const PROVIDER: &str = "finnhub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinnhubConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for FinnhubConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(DEFAULT_FINNHUB_BASE_URL),
        }
    }
}

/// Insider transactions from the Finnhub stock endpoint.
#[derive(Clone)]
pub struct FinnhubInsiderAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    auth: HttpAuth,
}

impl FinnhubInsiderAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: FinnhubConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "FINNHUB_API_KEY",
            })?;
        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: HttpAuth::Header {
                name: String::from("X-Finnhub-Token"),
                value: api_key,
            },
        })
    }

    fn insider_url(&self, symbol: &Symbol, window: DateWindow) -> String {
        format!(
            "{}/api/v1/stock/insider-transactions?symbol={}&from={}&to={}",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
            format_date(window.from),
            format_date(window.to)
        )
    }

    async fn fetch_transactions(
        &self,
        symbol: &Symbol,
        window: DateWindow,
    ) -> Result<Vec<InsiderTransaction>, SourceError> {
        let request = HttpRequest::get(self.insider_url(symbol, window)).with_auth(&self.auth);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceError::from_transport(PROVIDER, &error))?;

        if !response.is_success() {
            return Err(SourceError::from_status(PROVIDER, &response));
        }

        let payload: FinnhubInsiderResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::malformed(format!("failed to parse finnhub response: {e}")))?;

        if let Some(error) = payload.error {
            return Err(SourceError::upstream(format!("finnhub error: {error}")));
        }

        Ok(payload
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| row.into_transaction(symbol))
            .collect())
    }
}

impl InsiderSource for FinnhubInsiderAdapter {
    fn insider_transactions<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: DateWindow,
    ) -> SourceFuture<'a, Vec<InsiderTransaction>> {
        Box::pin(async move { self.fetch_transactions(symbol, window).await })
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubInsiderResponse {
    #[serde(default)]
    data: Option<Vec<FinnhubInsiderRow>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubInsiderRow {
    name: Option<String>,
    share: Option<f64>,
    change: Option<f64>,
    filing_date: Option<String>,
    transaction_date: Option<String>,
    transaction_price: Option<f64>,
    transaction_code: Option<String>,
}

impl FinnhubInsiderRow {
    /// Rows without an insider name are skipped. Share counts arrive as
    /// floats and are rounded.
    fn into_transaction(self, symbol: &Symbol) -> Option<InsiderTransaction> {
        let name = self.name.filter(|name| !name.trim().is_empty())?;
        Some(InsiderTransaction {
            symbol: symbol.clone(),
            name,
            share: round_shares(self.share),
            change: round_shares(self.change),
            filing_date: self.filing_date.as_deref().and_then(|d| parse_date(d).ok()),
            transaction_date: self
                .transaction_date
                .as_deref()
                .and_then(|d| parse_date(d).ok()),
            transaction_price: self.transaction_price.filter(|price| price.is_finite()),
            transaction_code: self.transaction_code.filter(|code| !code.is_empty()),
        })
    }
}

fn round_shares(value: Option<f64>) -> i64 {
    value
        .filter(|value| value.is_finite())
        .map_or(0, |value| value.round() as i64)
}
