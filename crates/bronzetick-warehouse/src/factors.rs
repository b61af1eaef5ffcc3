//! Per-ticker daily factors and their correlation matrix.

use ::duckdb::params;
use serde::Serialize;

use crate::{AccessMode, Warehouse, WarehouseError};

/// Factor order used by [`FactorCorrelation`].
pub const FACTOR_NAMES: [&str; 5] = [
    "close_price",
    "volume_1d",
    "daily_sentiment_score",
    "net_value_flow",
    "price_change_pct_1d",
];

/// One row of `vw_ticker_factors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFactorRow {
    pub ticker: String,
    pub date: String,
    pub close: f64,
    pub volume: i64,
    /// `None` on the first stored day.
    pub price_change_pct: Option<f64>,
    pub volume_change: Option<i64>,
    pub news_count: i64,
    pub sentiment_score: f64,
    pub net_value_flow: f64,
}

impl TickerFactorRow {
    fn factor(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.close),
            1 => Some(self.volume as f64),
            2 => Some(self.sentiment_score),
            3 => Some(self.net_value_flow),
            4 => self.price_change_pct,
            _ => None,
        }
    }
}

impl Warehouse {
    /// Factor rows for one ticker, oldest first.
    pub fn ticker_factors(&self, ticker: &str) -> Result<Vec<TickerFactorRow>, WarehouseError> {
        let connection = self.connect(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT ticker, CAST(date AS VARCHAR), close, CAST(volume AS BIGINT), \
             price_change_pct, CAST(volume_change AS BIGINT), CAST(news_count AS BIGINT), \
             CAST(sentiment_score AS DOUBLE), CAST(net_value_flow AS DOUBLE) \
             FROM vw_ticker_factors WHERE ticker = ? ORDER BY date",
        )?;
        let rows = statement.query_map(params![ticker], |row| {
            Ok(TickerFactorRow {
                ticker: row.get(0)?,
                date: row.get(1)?,
                close: row.get(2)?,
                volume: row.get(3)?,
                price_change_pct: row.get(4)?,
                volume_change: row.get(5)?,
                news_count: row.get(6)?,
                sentiment_score: row.get(7)?,
                net_value_flow: row.get(8)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Pearson correlation matrix over [`FACTOR_NAMES`].
///
/// Each cell uses the days on which both factors are present. A cell is
/// `None` when fewer than two such days exist or either factor is constant
/// over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorCorrelation {
    pub factors: Vec<String>,
    pub observations: usize,
    pub matrix: Vec<Vec<Option<f64>>>,
}

impl FactorCorrelation {
    pub fn from_rows(rows: &[TickerFactorRow]) -> Self {
        let width = FACTOR_NAMES.len();
        let mut matrix = vec![vec![None; width]; width];
        for (left, cells) in matrix.iter_mut().enumerate() {
            for (right, cell) in cells.iter_mut().enumerate() {
                let pairs: Vec<(f64, f64)> = rows
                    .iter()
                    .filter_map(|row| Some((row.factor(left)?, row.factor(right)?)))
                    .collect();
                *cell = pearson(&pairs);
            }
        }

        Self {
            factors: FACTOR_NAMES.iter().map(|name| name.to_string()).collect(),
            observations: rows.len(),
            matrix,
        }
    }

    pub fn get(&self, left: &str, right: &str) -> Option<f64> {
        let left = FACTOR_NAMES.iter().position(|name| *name == left)?;
        let right = FACTOR_NAMES.iter().position(|name| *name == right)?;
        self.matrix[left][right]
    }
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let count = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x <= f64::EPSILON || variance_y <= f64::EPSILON {
        return None;
    }
    let value = covariance / (variance_x.sqrt() * variance_y.sqrt());
    Some(value.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        InsiderTransactionRecord, NewsRecord, StockBarRecord, WarehouseConfig, WatchlistEntry,
    };
    use tempfile::tempdir;

    fn row(date: &str, close: f64, volume: i64, sentiment: f64) -> TickerFactorRow {
        TickerFactorRow {
            ticker: String::from("AAPL"),
            date: date.to_string(),
            close,
            volume,
            price_change_pct: None,
            volume_change: None,
            news_count: 0,
            sentiment_score: sentiment,
            net_value_flow: 0.0,
        }
    }

    #[test]
    fn linear_factors_correlate_perfectly() {
        let rows = vec![
            row("2024-01-02", 10.0, 100, 1.0),
            row("2024-01-03", 11.0, 110, -1.0),
            row("2024-01-04", 12.0, 120, 1.0),
        ];

        let correlation = FactorCorrelation::from_rows(&rows);

        let value = correlation
            .get("close_price", "volume_1d")
            .expect("defined");
        assert!((value - 1.0).abs() < 1e-12);
        let diagonal = correlation
            .get("close_price", "close_price")
            .expect("diagonal");
        assert!((diagonal - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_or_missing_factors_are_undefined() {
        let rows = vec![
            row("2024-01-02", 10.0, 100, 0.0),
            row("2024-01-03", 11.0, 90, 0.0),
        ];

        let correlation = FactorCorrelation::from_rows(&rows);

        assert_eq!(correlation.get("close_price", "net_value_flow"), None);
        assert_eq!(correlation.get("close_price", "price_change_pct_1d"), None);
        assert_eq!(
            correlation.get("close_price", "daily_sentiment_score"),
            None
        );
    }

    #[test]
    fn factor_view_joins_prices_news_and_insider_flow() {
        let temp = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::in_home(temp.path().join("home"))).expect("open");
        warehouse
            .register_watchlist(&[WatchlistEntry {
                ticker: String::from("AAPL"),
                company: String::from("Apple"),
            }])
            .expect("watchlist");

        let bars = vec![
            StockBarRecord {
                ticker: String::from("AAPL"),
                date: String::from("2024-01-02"),
                open: 187.0,
                high: 188.0,
                low: 183.0,
                close: 200.0,
                volume: 1_000,
            },
            StockBarRecord {
                ticker: String::from("AAPL"),
                date: String::from("2024-01-03"),
                open: 184.0,
                high: 185.0,
                low: 182.0,
                close: 210.0,
                volume: 1_500,
            },
        ];
        warehouse.upsert_batch(&bars).expect("bars");

        let news = vec![
            NewsRecord {
                company: String::from("Apple"),
                title: String::from("Apple beats estimates"),
                description: None,
                url: None,
                published_at: String::from("2024-01-03T13:00:00Z"),
                sentiment: String::from("good"),
            },
            NewsRecord {
                company: String::from("Apple"),
                title: String::from("Apple faces inquiry"),
                description: None,
                url: None,
                published_at: String::from("2024-01-03T15:00:00Z"),
                sentiment: String::from("good"),
            },
        ];
        warehouse.upsert_batch(&news).expect("news");

        let insider = vec![InsiderTransactionRecord {
            symbol: String::from("AAPL"),
            name: String::from("Cook Timothy"),
            share: 3_000,
            change: -100,
            filing_date: Some(String::from("2024-01-04")),
            transaction_date: Some(String::from("2024-01-03")),
            transaction_price: Some(2.5),
            transaction_code: Some(String::from("S")),
        }];
        warehouse.upsert_batch(&insider).expect("insider");

        let rows = warehouse.ticker_factors("AAPL").expect("factors");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-01-02");
        assert_eq!(rows[0].price_change_pct, None);
        assert_eq!(rows[0].news_count, 0);
        assert_eq!(rows[1].news_count, 2);
        assert_eq!(rows[1].sentiment_score, 2.0);
        assert_eq!(rows[1].net_value_flow, -250.0);
        assert_eq!(rows[1].volume_change, Some(500));
        let pct = rows[1].price_change_pct.expect("pct change");
        assert!((pct - 5.0).abs() < 1e-9);
    }
}
