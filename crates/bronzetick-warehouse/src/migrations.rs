use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_bronze_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS stocks (
    id VARCHAR PRIMARY KEY,
    ticker VARCHAR NOT NULL,
    date DATE NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS news (
    id VARCHAR PRIMARY KEY,
    company VARCHAR NOT NULL,
    title VARCHAR NOT NULL,
    description VARCHAR,
    url VARCHAR,
    published_at TIMESTAMP NOT NULL,
    sentiment VARCHAR NOT NULL,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS insider_transactions (
    id VARCHAR PRIMARY KEY,
    symbol VARCHAR NOT NULL,
    name VARCHAR NOT NULL,
    "share" BIGINT NOT NULL,
    "change" BIGINT NOT NULL,
    filing_date DATE,
    transaction_date DATE,
    transaction_price DOUBLE,
    transaction_code VARCHAR,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS ingest_log (
    request_id VARCHAR NOT NULL,
    dataset VARCHAR NOT NULL,
    received BIGINT NOT NULL,
    inserted BIGINT NOT NULL,
    skipped BIGINT NOT NULL,
    status VARCHAR NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_watchlist",
        sql: r#"
CREATE TABLE IF NOT EXISTS watchlist (
    ticker VARCHAR PRIMARY KEY,
    company VARCHAR NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0003_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_stocks_ticker_date ON stocks(ticker, date);
CREATE INDEX IF NOT EXISTS idx_news_company_published ON news(company, published_at);
CREATE INDEX IF NOT EXISTS idx_insider_symbol_date ON insider_transactions(symbol, transaction_date);
CREATE INDEX IF NOT EXISTS idx_ingest_log_dataset_ts ON ingest_log(dataset, timestamp);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
