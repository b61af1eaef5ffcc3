//! # Bronzetick Warehouse
//!
//! DuckDB-backed bronze layer for market prices, news and insider filings.
//!
//! Every stored record carries an `id` derived from its natural key (see
//! [`digest::RecordId`]). Batches are written with insert-or-ignore semantics
//! in a single transaction, so re-running an ingestion never duplicates or
//! overwrites rows.
//!
//! ```rust,no_run
//! use bronzetick_warehouse::{StockBarRecord, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::in_home("/tmp/bronzetick"))?;
//!     let bars = vec![StockBarRecord {
//!         ticker: "AAPL".to_string(),
//!         date: "2024-01-02".to_string(),
//!         open: 187.15,
//!         high: 188.44,
//!         low: 183.89,
//!         close: 185.64,
//!         volume: 82_488_700,
//!     }];
//!     let report = warehouse.upsert_batch(&bars)?;
//!     println!("inserted {} of {}", report.inserted, report.received);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `stocks` | Daily bars keyed by (ticker, date) |
//! | `news` | Classified articles keyed by (company, title, published_at) |
//! | `insider_transactions` | Filings keyed by (symbol, name, transaction_date, change, share) |
//! | `watchlist` | Ticker to company mapping |
//! | `ingest_log` | One row per batch write |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_stock_daily` | Close, volume and day-over-day changes |
//! | `vw_news_daily` | Article count and sentiment score per ticker/day |
//! | `vw_insider_daily` | Insider buying, selling and net value flow per ticker/day |
//! | `vw_ticker_factors` | All of the above joined per ticker/day |

pub mod digest;
pub mod duckdb;
pub mod factors;
pub mod migrations;
pub mod records;
pub mod views;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{Connection, Statement};
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;
use tracing::{debug, info};

pub use digest::{RecordId, RECORD_ID_WIDTH};
pub use duckdb::{AccessMode, DuckDbConnector};
pub use factors::{FactorCorrelation, TickerFactorRow, FACTOR_NAMES};
pub use records::{
    Column, ColumnKind, IngestRecord, InsiderTransactionRecord, NewsRecord, StockBarRecord,
    WatchlistEntry,
};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected due to policy violation.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution timed out.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// The store could not be opened or did not answer the connectivity query.
    #[error("store at '{}' is unreachable: {reason}", path.display())]
    Unreachable { path: PathBuf, reason: String },
}

/// Location of the warehouse database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    /// Root directory for bronzetick data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl WarehouseConfig {
    /// Place the database at `<home>/warehouse.duckdb`.
    pub fn in_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("warehouse.duckdb");
        Self { home, db_path }
    }
}

/// Guardrails for query execution to prevent resource exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether results were truncated due to `max_rows`.
    pub truncated: bool,
}

/// Answer to the connectivity check.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub db_path: PathBuf,
    pub version: String,
}

/// Outcome of one [`Warehouse::upsert_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub table: String,
    /// Identifier written to `ingest_log`; empty when nothing was written.
    pub request_id: String,
    pub received: usize,
    pub inserted: usize,
    /// Rows whose id was already stored.
    pub skipped_existing: usize,
    /// Later duplicates of an id seen earlier in the same batch.
    pub skipped_in_batch: usize,
}

impl UpsertReport {
    pub fn empty(table: &str) -> Self {
        Self {
            table: table.to_string(),
            request_id: String::new(),
            received: 0,
            inserted: 0,
            skipped_existing: 0,
            skipped_in_batch: 0,
        }
    }
}

/// The bronze-layer store.
#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    connector: DuckDbConnector,
}

impl Warehouse {
    /// Build a handle without touching the filesystem.
    pub fn new(config: WarehouseConfig) -> Self {
        let connector = DuckDbConnector::new(config.db_path.clone());
        Self { config, connector }
    }

    /// Build a handle, create the database directory and apply the schema.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let warehouse = Self::new(config);
        warehouse.ensure_parent_dir()?;
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.connector.db_path()
    }

    /// Open a connection and run `SELECT version()`.
    ///
    /// Any failure, including a database path that cannot be created or
    /// opened, is reported as [`WarehouseError::Unreachable`].
    pub fn check_connectivity(&self) -> Result<StoreStatus, WarehouseError> {
        let unreachable = |reason: String| WarehouseError::Unreachable {
            path: self.db_path().to_path_buf(),
            reason,
        };

        self.ensure_parent_dir()
            .map_err(|error| unreachable(error.to_string()))?;
        let connection = self
            .connector
            .connect(AccessMode::ReadWrite)
            .map_err(|error| unreachable(error.to_string()))?;
        let version: String = connection
            .query_row("SELECT version()", [], |row| row.get(0))
            .map_err(|error| unreachable(error.to_string()))?;

        debug!(db = %self.db_path().display(), %version, "store reachable");
        Ok(StoreStatus {
            db_path: self.db_path().to_path_buf(),
            version,
        })
    }

    /// Apply pending migrations and (re)create the analytical views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.connector.connect(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    /// Insert-or-ignore a batch keyed by each record's [`RecordId`].
    ///
    /// The whole batch, including its `ingest_log` row, is written in one
    /// transaction. On any error the transaction is rolled back and no rows
    /// from the batch remain. Within the batch the first occurrence of an id
    /// wins. An empty batch does not open the store.
    pub fn upsert_batch<R: IngestRecord>(&self, rows: &[R]) -> Result<UpsertReport, WarehouseError> {
        let mut report = UpsertReport::empty(R::TABLE);
        if rows.is_empty() {
            return Ok(report);
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let unique: Vec<(RecordId, &R)> = rows
            .iter()
            .filter_map(|row| {
                let id = row.record_id();
                seen.insert(id.clone()).then_some((id, row))
            })
            .collect();

        let request_id = uuid::Uuid::new_v4().to_string();
        let insert_sql = insert_statement::<R>();
        let received = rows.len();
        let skipped_in_batch = received - unique.len();

        let connection = self.connector.connect(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let before = count_rows(&connection, R::TABLE)?;
            for (id, row) in &unique {
                let id = id.as_str();
                let mut params: Vec<&dyn ToSql> = Vec::with_capacity(R::COLUMNS.len() + 1);
                params.push(&id);
                params.extend(row.sql_values());
                connection.execute(insert_sql.as_str(), params.as_slice())?;
            }
            let after = count_rows(&connection, R::TABLE)?;
            let inserted = usize::try_from(after - before).unwrap_or_default();

            let received_count = i64::try_from(received).unwrap_or(i64::MAX);
            let inserted_count = after - before;
            let skipped_count = received_count - inserted_count;
            let params: [&dyn ToSql; 5] = [
                &request_id,
                &R::TABLE,
                &received_count,
                &inserted_count,
                &skipped_count,
            ];
            connection.execute(
                "INSERT INTO ingest_log \
                 (request_id, dataset, received, inserted, skipped, status, timestamp) \
                 VALUES (?, ?, ?, ?, ?, 'ok', CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            Ok(inserted)
        })();
        let inserted = finalize_transaction(&connection, result)?;

        report.request_id = request_id;
        report.received = received;
        report.inserted = inserted;
        report.skipped_in_batch = skipped_in_batch;
        report.skipped_existing = unique.len().saturating_sub(inserted);

        info!(
            table = R::TABLE,
            received = report.received,
            inserted = report.inserted,
            skipped_existing = report.skipped_existing,
            skipped_in_batch = report.skipped_in_batch,
            "batch upserted"
        );
        Ok(report)
    }

    /// Replace the ticker to company mapping used by the news views.
    pub fn register_watchlist(&self, entries: &[WatchlistEntry]) -> Result<(), WarehouseError> {
        let connection = self.connector.connect(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for entry in entries {
                let params: [&dyn ToSql; 2] = [&entry.ticker, &entry.company];
                connection.execute(
                    "INSERT OR REPLACE INTO watchlist (ticker, company, updated_at) \
                     VALUES (?, ?, CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
            }
            Ok(())
        })();
        finalize_transaction(&connection, result)
    }

    /// Number of rows currently stored for a record type.
    pub fn stored_count<R: IngestRecord>(&self) -> Result<u64, WarehouseError> {
        let connection = self.connector.connect(AccessMode::ReadOnly)?;
        let count = count_rows(&connection, R::TABLE)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Execute a SQL query with guardrails.
    ///
    /// Only SELECT-like single statements are accepted unless `allow_write`
    /// is set.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.connector.connect(mode)?;
        execute_with_guardrails(&connection, sql, guardrails, allow_write)
    }

    pub(crate) fn connect(&self, mode: AccessMode) -> Result<Connection, WarehouseError> {
        Ok(self.connector.connect(mode)?)
    }

    fn ensure_parent_dir(&self) -> Result<(), std::io::Error> {
        match self.db_path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

fn insert_statement<R: IngestRecord>() -> String {
    let columns = R::COLUMNS
        .iter()
        .map(|column| format!("\"{}\"", column.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = R::COLUMNS
        .iter()
        .map(|column| column.placeholder())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} (id, {columns}) VALUES (?, {placeholders}) ON CONFLICT (id) DO NOTHING",
        table = R::TABLE
    )
}

fn count_rows(connection: &Connection, table: &str) -> Result<i64, WarehouseError> {
    // Table names come from `IngestRecord::TABLE` constants only.
    let sql = format!("SELECT COUNT(*) FROM {table}");
    Ok(connection.query_row(sql.as_str(), [], |row| row.get(0))?)
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    if is_select_like(sql) {
        execute_select_query(connection, sql, guardrails, started)
    } else if allow_write {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    } else {
        Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are allowed unless --write is provided",
        )))
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
    // Column metadata is only available once the statement has run.
    let columns = rows_cursor.as_ref().map(result_columns).unwrap_or_default();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn result_columns(statement: &Statement<'_>) -> Vec<SqlColumn> {
    (0..statement.column_count())
        .map(|index| SqlColumn {
            name: statement
                .column_name(index)
                .map_or_else(|_| format!("column_{index}"), ToString::to_string),
            r#type: statement.column_type(index).to_string(),
        })
        .collect()
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// NaN and infinities become `null`.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

/// A `;` inside a quoted literal or identifier does not end a statement.
fn has_multiple_statements(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for (index, ch) in sql.char_indices() {
        match quote {
            // A doubled quote closes and reopens, which keeps the span open.
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == ';' => {
                if sql[index + 1..]
                    .chars()
                    .any(|rest| !rest.is_whitespace() && rest != ';')
                {
                    return true;
                }
            }
            None => {}
        }
    }
    false
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        });
    }
    Ok(())
}
