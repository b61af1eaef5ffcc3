//! Flat record shapes stored in the bronze tables.
//!
//! Field order on each struct is the column order used for the fallback CSV
//! files and the order values are bound on insert.

use ::duckdb::ToSql;
use serde::{Deserialize, Serialize};

use crate::digest::RecordId;

/// How a bound value is converted on its way into a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    Date,
    Timestamp,
}

/// One stored column besides `id`.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Plain,
        }
    }

    const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Date,
        }
    }

    const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Timestamp,
        }
    }

    pub(crate) fn placeholder(self) -> &'static str {
        match self.kind {
            ColumnKind::Plain => "?",
            ColumnKind::Date => "CAST(? AS DATE)",
            ColumnKind::Timestamp => "CAST(? AS TIMESTAMP)",
        }
    }
}

/// A record that can be written through [`crate::Warehouse::upsert_batch`].
pub trait IngestRecord {
    /// Target table.
    const TABLE: &'static str;
    /// Columns after `id`, matching the order of [`IngestRecord::sql_values`].
    const COLUMNS: &'static [Column];

    /// Natural-key fields rendered as text, in key order.
    fn natural_key(&self) -> Vec<String>;

    /// Values bound for [`IngestRecord::COLUMNS`].
    fn sql_values(&self) -> Vec<&dyn ToSql>;

    fn record_id(&self) -> RecordId {
        RecordId::from_key(&self.natural_key())
    }
}

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBarRecord {
    pub ticker: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl IngestRecord for StockBarRecord {
    const TABLE: &'static str = "stocks";
    const COLUMNS: &'static [Column] = &[
        Column::plain("ticker"),
        Column::date("date"),
        Column::plain("open"),
        Column::plain("high"),
        Column::plain("low"),
        Column::plain("close"),
        Column::plain("volume"),
    ];

    fn natural_key(&self) -> Vec<String> {
        vec![self.ticker.clone(), self.date.clone()]
    }

    fn sql_values(&self) -> Vec<&dyn ToSql> {
        let values: [&dyn ToSql; 7] = [
            &self.ticker,
            &self.date,
            &self.open,
            &self.high,
            &self.low,
            &self.close,
            &self.volume,
        ];
        values.to_vec()
    }
}

/// Classified news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub company: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    /// RFC3339 UTC, e.g. `2024-01-02T15:04:05Z`.
    pub published_at: String,
    pub sentiment: String,
}

impl IngestRecord for NewsRecord {
    const TABLE: &'static str = "news";
    const COLUMNS: &'static [Column] = &[
        Column::plain("company"),
        Column::plain("title"),
        Column::plain("description"),
        Column::plain("url"),
        Column::timestamp("published_at"),
        Column::plain("sentiment"),
    ];

    fn natural_key(&self) -> Vec<String> {
        vec![
            self.company.clone(),
            self.title.clone(),
            self.published_at.clone(),
        ]
    }

    fn sql_values(&self) -> Vec<&dyn ToSql> {
        let values: [&dyn ToSql; 6] = [
            &self.company,
            &self.title,
            &self.description,
            &self.url,
            &self.published_at,
            &self.sentiment,
        ];
        values.to_vec()
    }
}

/// Insider transaction filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransactionRecord {
    pub symbol: String,
    pub name: String,
    /// Shares held after the transaction.
    pub share: i64,
    /// Signed share delta; negative for sales.
    pub change: i64,
    pub filing_date: Option<String>,
    pub transaction_date: Option<String>,
    pub transaction_price: Option<f64>,
    pub transaction_code: Option<String>,
}

impl IngestRecord for InsiderTransactionRecord {
    const TABLE: &'static str = "insider_transactions";
    const COLUMNS: &'static [Column] = &[
        Column::plain("symbol"),
        Column::plain("name"),
        Column::plain("share"),
        Column::plain("change"),
        Column::date("filing_date"),
        Column::date("transaction_date"),
        Column::plain("transaction_price"),
        Column::plain("transaction_code"),
    ];

    fn natural_key(&self) -> Vec<String> {
        vec![
            self.symbol.clone(),
            self.name.clone(),
            self.transaction_date.clone().unwrap_or_default(),
            self.change.to_string(),
            self.share.to_string(),
        ]
    }

    fn sql_values(&self) -> Vec<&dyn ToSql> {
        let values: [&dyn ToSql; 8] = [
            &self.symbol,
            &self.name,
            &self.share,
            &self.change,
            &self.filing_date,
            &self.transaction_date,
            &self.transaction_price,
            &self.transaction_code,
        ];
        values.to_vec()
    }
}

/// Ticker to company mapping used to join news onto prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub ticker: String,
    pub company: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> StockBarRecord {
        StockBarRecord {
            ticker: String::from("AAPL"),
            date: String::from("2024-01-02"),
            open: 187.15,
            high: 188.44,
            low: 183.89,
            close: 185.64,
            volume: 82_488_700,
        }
    }

    #[test]
    fn non_key_fields_do_not_affect_the_identifier() {
        let original = sample_bar();
        let mut revised = sample_bar();
        revised.close = 190.0;
        revised.volume = 1;
        assert_eq!(original.record_id(), revised.record_id());
    }

    #[test]
    fn columns_and_values_stay_aligned() {
        let bar = sample_bar();
        assert_eq!(bar.sql_values().len(), StockBarRecord::COLUMNS.len());

        let news = NewsRecord {
            company: String::from("Apple"),
            title: String::from("Apple ships"),
            description: None,
            url: None,
            published_at: String::from("2024-01-02T15:04:05Z"),
            sentiment: String::from("good"),
        };
        assert_eq!(news.sql_values().len(), NewsRecord::COLUMNS.len());

        let insider = InsiderTransactionRecord {
            symbol: String::from("NVDA"),
            name: String::from("Huang Jen Hsun"),
            share: 100,
            change: -10,
            filing_date: None,
            transaction_date: None,
            transaction_price: None,
            transaction_code: Some(String::from("S")),
        };
        assert_eq!(
            insider.sql_values().len(),
            InsiderTransactionRecord::COLUMNS.len()
        );
    }

    #[test]
    fn missing_transaction_date_renders_as_empty_key_field() {
        let insider = InsiderTransactionRecord {
            symbol: String::from("META"),
            name: String::from("Zuckerberg Mark"),
            share: 5,
            change: -2,
            filing_date: None,
            transaction_date: None,
            transaction_price: None,
            transaction_code: None,
        };
        assert_eq!(
            insider.natural_key(),
            vec!["META", "Zuckerberg Mark", "", "-2", "5"]
        );
    }
}
