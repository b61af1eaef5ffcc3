//! CLI argument definitions for bronzetick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stocks` | Fetch daily bars and store them |
//! | `news` | Fetch company news, classify sentiment, store |
//! | `insider` | Fetch insider transactions and store them |
//! | `check` | Probe the store and apply the schema |
//! | `sql` | Query the local DuckDB store |
//! | `analytics` | Factor rows and correlation matrix for one ticker |
//! | `change` | Day-over-day close change |
//! | `sample-size` | A/B-test sample size calculator |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Fail when a job reports failures or warnings |
//! | `--db` | config | DuckDB file to use |
//! | `--fallback-dir` | config | Directory for CSV fallback files |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! bronzetick stocks --tickers AAPL,NVDA --period 5d
//! bronzetick news --companies Apple --lookback-days 2 --pretty
//! bronzetick sql "SELECT * FROM vw_ticker_factors WHERE ticker = 'AAPL'"
//! bronzetick sample-size --baseline 10 --lift 20 --confidence 95 --power 80
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Bronze-layer market data collector
///
/// Fetches prices, news and insider filings, classifies headline sentiment
/// and stores everything idempotently in a local DuckDB file.
#[derive(Debug, Parser)]
#[command(
    name = "bronzetick",
    author,
    version,
    about = "Bronze-layer market data collector",
    long_about = "bronzetick collects market data into a local DuckDB store:\n\
\n\
  • Daily bars from the Yahoo chart API\n\
  • Company news from NewsAPI, classified by a hosted chat model\n\
  • Insider transactions from Finnhub\n\
  • Idempotent writes keyed by a content digest, with CSV fallback\n\
\n\
Credentials are read from NEWS_API_KEY, FINNHUB_API_KEY and GROQ_API_KEY.\n\
Use 'bronzetick <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Exit non-zero when a job records entity failures or warnings.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// DuckDB file, overriding BRONZETICK_DB.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Fallback CSV directory, overriding BRONZETICK_FALLBACK_DIR.
    #[arg(long, global = true)]
    pub fallback_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch daily OHLCV bars for the watchlist tickers.
    ///
    ///   bronzetick stocks
    ///   bronzetick stocks --tickers AAPL,MSFT --period 1mo
    Stocks(StocksArgs),

    /// Fetch company news and classify each headline.
    ///
    ///   bronzetick news
    ///   bronzetick news --companies "Apple,Nvidia" --labels good,bad
    News(NewsArgs),

    /// Fetch insider transactions (default window: yesterday).
    ///
    ///   bronzetick insider --tickers NVDA --from 2024-01-01 --to 2024-01-31
    Insider(InsiderArgs),

    /// Check that the store opens and apply pending migrations.
    Check,

    /// Run SQL against the store.
    ///
    /// Read-only by default; use --write for data modifications. Results
    /// are capped by --max-rows and --query-timeout-ms.
    ///
    ///   bronzetick sql "SELECT COUNT(*) FROM stocks"
    Sql(SqlArgs),

    /// Daily factor rows and their correlation matrix for one ticker.
    ///
    ///   bronzetick analytics AAPL
    Analytics(AnalyticsArgs),

    /// Change between the two latest closes, fetched live.
    ///
    ///   bronzetick change --tickers AAPL,NFLX
    Change(ChangeArgs),

    /// Per-variant sample size for an A/B test on conversion rates.
    ///
    /// Missing values are prompted for interactively.
    ///
    ///   bronzetick sample-size --baseline 10 --lift 20 --confidence 95 --power 80
    SampleSize(SampleSizeArgs),
}

#[derive(Debug, Args)]
pub struct StocksArgs {
    /// Comma separated tickers (default: watchlist).
    #[arg(long)]
    pub tickers: Option<String>,

    /// History range: 1d 5d 10d 1mo 3mo 6mo 1y 2y 5y ytd max.
    #[arg(long, default_value = "1d")]
    pub period: String,

    /// Write CSV to the fallback directory instead of the store.
    #[arg(long, default_value_t = false)]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct NewsArgs {
    /// Comma separated company names (default: watchlist).
    #[arg(long)]
    pub companies: Option<String>,

    /// How many days back to search.
    #[arg(long)]
    pub lookback_days: Option<u16>,

    /// Sentiment labels, e.g. good,bad or good,bad,neutral.
    #[arg(long)]
    pub labels: Option<String>,

    /// Label stored when classification fails.
    #[arg(long)]
    pub fallback_label: Option<String>,

    /// Write CSV to the fallback directory instead of the store.
    #[arg(long, default_value_t = false)]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct InsiderArgs {
    /// Comma separated tickers (default: watchlist).
    #[arg(long)]
    pub tickers: Option<String>,

    /// First day, YYYY-MM-DD (default: yesterday).
    #[arg(long)]
    pub from: Option<String>,

    /// Last day, YYYY-MM-DD (default: --from).
    #[arg(long)]
    pub to: Option<String>,

    /// Write CSV to the fallback directory instead of the store.
    #[arg(long, default_value_t = false)]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write operations (INSERT, UPDATE, DELETE, CREATE, etc.).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct ChangeArgs {
    /// Comma separated tickers (default: watchlist).
    #[arg(long)]
    pub tickers: Option<String>,

    /// History range fetched to find the two latest closes.
    #[arg(long, default_value = "5d")]
    pub period: String,
}

#[derive(Debug, Args)]
pub struct SampleSizeArgs {
    /// Baseline conversion rate in percent.
    #[arg(long)]
    pub baseline: Option<f64>,

    /// Minimum detectable lift relative to the baseline, in percent.
    #[arg(long)]
    pub lift: Option<f64>,

    /// Confidence level in percent.
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Statistical power in percent.
    #[arg(long)]
    pub power: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "bronzetick",
            "stocks",
            "--tickers",
            "AAPL",
            "--db",
            "/tmp/x.duckdb",
            "--pretty",
        ])
        .expect("parse");

        assert!(cli.pretty);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.duckdb")));
        let Command::Stocks(args) = cli.command else {
            panic!("expected stocks");
        };
        assert_eq!(args.tickers.as_deref(), Some("AAPL"));
        assert_eq!(args.period, "1d");
    }

    #[test]
    fn sample_size_values_are_optional() {
        let cli = Cli::try_parse_from(["bronzetick", "sample-size", "--baseline", "10"]).expect("parse");
        let Command::SampleSize(args) = cli.command else {
            panic!("expected sample-size");
        };
        assert_eq!(args.baseline, Some(10.0));
        assert_eq!(args.power, None);
    }
}
