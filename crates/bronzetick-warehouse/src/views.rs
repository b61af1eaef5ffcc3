//! Database views for analytical queries.

use ::duckdb::Connection;

/// Create the per-ticker daily views.
///
/// - `vw_stock_daily`: close, volume, percent change vs the previous close, volume change
/// - `vw_news_daily`: article count and sentiment score per ticker and day (good +1, bad -1)
/// - `vw_insider_daily`: shares bought, shares sold and net value flow per ticker and day
/// - `vw_ticker_factors`: the three joined on ticker and date, missing news and flow as zero
///
/// News is keyed by company, so it reaches tickers through the `watchlist` table.
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE OR REPLACE VIEW vw_stock_daily AS
SELECT
    ticker,
    date,
    close,
    volume,
    CASE
        WHEN LAG(close) OVER (PARTITION BY ticker ORDER BY date) IS NULL THEN NULL
        WHEN LAG(close) OVER (PARTITION BY ticker ORDER BY date) = 0 THEN NULL
        ELSE (close / LAG(close) OVER (PARTITION BY ticker ORDER BY date) - 1.0) * 100.0
    END AS price_change_pct,
    volume - LAG(volume) OVER (PARTITION BY ticker ORDER BY date) AS volume_change
FROM stocks;

CREATE OR REPLACE VIEW vw_news_daily AS
SELECT
    w.ticker,
    CAST(n.published_at AS DATE) AS date,
    CAST(COUNT(*) AS BIGINT) AS news_count,
    CAST(SUM(
        CASE lower(n.sentiment)
            WHEN 'good' THEN 1
            WHEN 'bad' THEN -1
            ELSE 0
        END
    ) AS DOUBLE) AS sentiment_score
FROM news n
JOIN watchlist w ON lower(w.company) = lower(n.company)
GROUP BY w.ticker, CAST(n.published_at AS DATE);

CREATE OR REPLACE VIEW vw_insider_daily AS
SELECT
    symbol AS ticker,
    transaction_date AS date,
    CAST(SUM(CASE WHEN "change" > 0 THEN "change" ELSE 0 END) AS BIGINT) AS shares_bought,
    CAST(SUM(CASE WHEN "change" < 0 THEN -"change" ELSE 0 END) AS BIGINT) AS shares_sold,
    CAST(SUM("change" * COALESCE(transaction_price, 0.0)) AS DOUBLE) AS net_value_flow
FROM insider_transactions
WHERE transaction_date IS NOT NULL
GROUP BY symbol, transaction_date;

CREATE OR REPLACE VIEW vw_ticker_factors AS
SELECT
    s.ticker,
    s.date,
    s.close,
    s.volume,
    s.price_change_pct,
    s.volume_change,
    COALESCE(n.news_count, 0) AS news_count,
    COALESCE(n.sentiment_score, 0.0) AS sentiment_score,
    COALESCE(i.net_value_flow, 0.0) AS net_value_flow
FROM vw_stock_daily s
LEFT JOIN vw_news_daily n ON n.ticker = s.ticker AND n.date = s.date
LEFT JOIN vw_insider_daily i ON i.ticker = s.ticker AND i.date = s.date;
"#,
    )?;

    Ok(())
}
