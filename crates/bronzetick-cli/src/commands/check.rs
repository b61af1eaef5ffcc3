use bronzetick_core::{AppConfig, Warehouse};
use bronzetick_warehouse::{InsiderTransactionRecord, NewsRecord, StockBarRecord};
use serde::Serialize;

use crate::error::CliError;
use crate::output::CommandOutput;

#[derive(Debug, Serialize)]
struct CheckResponseData {
    db_path: String,
    version: String,
    stocks: u64,
    news: u64,
    insider_transactions: u64,
    watchlist: usize,
}

/// Probe the store, apply migrations and report row counts.
pub fn run(config: &AppConfig) -> Result<CommandOutput, CliError> {
    let warehouse = Warehouse::new(config.warehouse.clone());
    let status = warehouse.check_connectivity()?;
    warehouse.initialize()?;
    warehouse.register_watchlist(&config.watchlist)?;

    let data = CheckResponseData {
        db_path: status.db_path.display().to_string(),
        version: status.version,
        stocks: warehouse.stored_count::<StockBarRecord>()?,
        news: warehouse.stored_count::<NewsRecord>()?,
        insider_transactions: warehouse.stored_count::<InsiderTransactionRecord>()?,
        watchlist: config.watchlist.len(),
    };
    Ok(CommandOutput::ok("check", serde_json::to_value(data)?))
}
