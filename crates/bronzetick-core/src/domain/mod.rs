//! # Domain Models
//!
//! Typed rows produced by the fetchers, validated at construction.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StockBar`] | Daily OHLCV bar for a ticker |
//! | [`NewsArticle`] | Article matched to a company, before classification |
//! | [`InsiderTransaction`] | Insider filing for a ticker |
//! | [`Symbol`] | Validated ticker |
//! | [`Company`] | Company name used as a news query |
//! | [`Period`] | Price-history lookback |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Each row converts into the flat record stored by the warehouse with
//! `to_record`, which is where dates and timestamps get their text form.

mod models;
mod period;
mod symbol;
pub(crate) mod timestamp;

pub use models::{InsiderTransaction, NewsArticle, StockBar};
pub use period::Period;
pub use symbol::{Company, Symbol};
pub use timestamp::{format_date, parse_date, today_utc, UtcDateTime};
