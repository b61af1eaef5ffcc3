use bronzetick_warehouse::{InsiderTransactionRecord, NewsRecord, StockBarRecord};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::timestamp::format_date;
use crate::{Company, Symbol, UtcDateTime, ValidationError};

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StockBar {
    pub ticker: Symbol,
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl StockBar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: Symbol,
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_finite("open", open)?;
        validate_finite("high", high)?;
        validate_finite("low", low)?;
        validate_finite("close", close)?;

        Ok(Self {
            ticker,
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn to_record(&self) -> StockBarRecord {
        StockBarRecord {
            ticker: self.ticker.to_string(),
            date: format_date(self.date),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// News article as returned by the provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub company: Company,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: UtcDateTime,
}

impl NewsArticle {
    /// Text handed to the classifier: the description, or the title when the
    /// description is missing or blank.
    pub fn classification_text(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(self.title.as_str())
    }

    pub fn to_record(&self, sentiment: &str) -> NewsRecord {
        NewsRecord {
            company: self.company.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.url.clone(),
            published_at: self.published_at.format_rfc3339(),
            sentiment: sentiment.to_string(),
        }
    }
}

/// Insider transaction filing.
#[derive(Debug, Clone, PartialEq)]
pub struct InsiderTransaction {
    pub symbol: Symbol,
    pub name: String,
    pub share: i64,
    pub change: i64,
    pub filing_date: Option<Date>,
    pub transaction_date: Option<Date>,
    pub transaction_price: Option<f64>,
    pub transaction_code: Option<String>,
}

impl InsiderTransaction {
    pub fn to_record(&self) -> InsiderTransactionRecord {
        InsiderTransactionRecord {
            symbol: self.symbol.to_string(),
            name: self.name.clone(),
            share: self.share,
            change: self.change,
            filing_date: self.filing_date.map(format_date),
            transaction_date: self.transaction_date.map(format_date),
            transaction_price: self.transaction_price,
            transaction_code: self.transaction_code.clone(),
        }
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn article(description: Option<&str>) -> NewsArticle {
        NewsArticle {
            company: Company::parse("Apple").expect("company"),
            title: String::from("Apple unveils headset"),
            description: description.map(str::to_string),
            url: None,
            published_at: UtcDateTime::parse("2024-01-02T15:04:05Z").expect("timestamp"),
        }
    }

    #[test]
    fn classification_prefers_description_over_title() {
        assert_eq!(
            article(Some("Shares climb on demand")).classification_text(),
            "Shares climb on demand"
        );
        assert_eq!(article(Some("   ")).classification_text(), "Apple unveils headset");
        assert_eq!(article(None).classification_text(), "Apple unveils headset");
    }

    #[test]
    fn records_render_keys_in_storage_format() {
        let bar = StockBar::new(
            Symbol::parse("aapl").expect("symbol"),
            date!(2024 - 01 - 02),
            187.15,
            188.44,
            183.89,
            185.64,
            82_488_700,
        )
        .expect("bar");
        let record = bar.to_record();
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.date, "2024-01-02");

        let news = article(None).to_record("good");
        assert_eq!(news.published_at, "2024-01-02T15:04:05Z");
        assert_eq!(news.sentiment, "good");
    }

    #[test]
    fn rejects_non_finite_prices() {
        let result = StockBar::new(
            Symbol::parse("AAPL").expect("symbol"),
            date!(2024 - 01 - 02),
            f64::NAN,
            1.0,
            1.0,
            1.0,
            0,
        );
        assert!(matches!(
            result,
            Err(ValidationError::NonFiniteValue { field: "open" })
        ));
    }
}
