mod analytics;
mod check;
mod jobs;
mod sample_size;
mod sql;

use std::sync::Arc;

use bronzetick_core::{
    AppConfig, CsvFallbackWriter, HttpClient, IngestionWriter, JobSink, ReqwestHttpClient, Symbol,
    Warehouse,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::CommandOutput;

/// Every command except `sample-size` reads the environment configuration.
pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        Command::SampleSize(args) => sample_size::run(args),
        Command::Stocks(args) => jobs::stocks(args, &load_config(cli)?).await,
        Command::News(args) => jobs::news(args, &load_config(cli)?).await,
        Command::Insider(args) => jobs::insider(args, &load_config(cli)?).await,
        Command::Check => check::run(&load_config(cli)?),
        Command::Sql(args) => sql::run(args, &load_config(cli)?),
        Command::Analytics(args) => analytics::factors(args, &load_config(cli)?),
        Command::Change(args) => analytics::change(args, &load_config(cli)?).await,
    }
}

/// Environment configuration with global flag overrides applied.
fn load_config(cli: &Cli) -> Result<AppConfig, CliError> {
    let mut config = AppConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.warehouse.db_path = db.clone();
    }
    if let Some(dir) = &cli.fallback_dir {
        config.fallback_dir = dir.clone();
    }
    Ok(config)
}

/// Probe the store before use so an unreachable file maps to its own exit code.
fn open_store(config: &AppConfig) -> Result<Warehouse, CliError> {
    let warehouse = Warehouse::new(config.warehouse.clone());
    warehouse.check_connectivity()?;
    warehouse.initialize()?;
    Ok(warehouse)
}

fn http_client() -> Arc<dyn HttpClient> {
    Arc::new(ReqwestHttpClient::new())
}

fn job_sink(config: &AppConfig, no_store: bool) -> JobSink {
    let fallback = CsvFallbackWriter::new(config.fallback_dir.clone());
    if no_store {
        return JobSink::Export(fallback);
    }
    JobSink::Store {
        writer: IngestionWriter::new(Warehouse::new(config.warehouse.clone()), fallback),
        watchlist: config.watchlist.clone(),
    }
}

/// `--tickers` when given, otherwise the configured watchlist.
fn resolve_tickers(raw: Option<&str>, config: &AppConfig) -> Result<Vec<Symbol>, CliError> {
    let tickers = match raw {
        Some(list) => Symbol::parse_list(list)?,
        None => config.tickers(),
    };
    if tickers.is_empty() {
        return Err(CliError::Command(String::from("no tickers to process")));
    }
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn sample_size_runs_from_flags_alone() {
        let cli = Cli::try_parse_from([
            "bronzetick",
            "sample-size",
            "--baseline",
            "10",
            "--lift",
            "20",
            "--confidence",
            "95",
            "--power",
            "80",
        ])
        .expect("parse");

        let output = run(&cli).await.expect("output");

        assert_eq!(output.command, "sample-size");
        assert_eq!(output.data["per_variant"], 3_835);
        assert_eq!(output.data["total"], 7_670);
    }
}
