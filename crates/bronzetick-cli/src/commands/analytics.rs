use bronzetick_core::{
    close_change, AppConfig, CloseChange, FactorCorrelation, Period, StockBarSource, Symbol,
    TickerFactorRow, YahooChartAdapter,
};
use serde::Serialize;
use tracing::warn;

use crate::cli::{AnalyticsArgs, ChangeArgs};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{http_client, open_store, resolve_tickers};

#[derive(Debug, Serialize)]
struct FactorResponseData {
    ticker: String,
    rows: Vec<TickerFactorRow>,
    correlation: FactorCorrelation,
}

pub fn factors(args: &AnalyticsArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let ticker = Symbol::parse(&args.ticker)?;
    let warehouse = open_store(config)?;
    let rows = warehouse.ticker_factors(ticker.as_str())?;
    let correlation = FactorCorrelation::from_rows(&rows);

    let empty = rows.is_empty();
    let data = FactorResponseData {
        ticker: ticker.to_string(),
        rows,
        correlation,
    };
    let mut output = CommandOutput::ok("analytics", serde_json::to_value(data)?);
    if empty {
        output = output.with_warning(format!("no stored prices for {ticker}"));
    }
    Ok(output)
}

#[derive(Debug, Serialize)]
struct ChangeResponseData {
    changes: Vec<CloseChange>,
}

pub async fn change(args: &ChangeArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let tickers = resolve_tickers(args.tickers.as_deref(), config)?;
    let period = Period::parse(&args.period)?;
    let source = YahooChartAdapter::with_http_client(http_client());

    let mut changes = Vec::with_capacity(tickers.len());
    let mut warnings = Vec::new();
    for (index, ticker) in tickers.iter().enumerate() {
        if index > 0 {
            config.pacing.between_entities().await;
        }
        let outcome = match source.daily_bars(ticker, period).await {
            Ok(bars) => close_change(&bars).map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };
        match outcome {
            Ok(change) => changes.push(change),
            Err(message) => {
                warn!(ticker = ticker.as_str(), error = %message, "close change unavailable");
                warnings.push(format!("{ticker}: {message}"));
            }
        }
    }

    let failures = warnings.len();
    Ok(
        CommandOutput::ok("change", serde_json::to_value(ChangeResponseData { changes })?)
            .with_warnings(warnings)
            .with_failures(failures),
    )
}
