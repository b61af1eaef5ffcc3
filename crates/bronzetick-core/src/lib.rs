//! # Bronzetick Core
//!
//! Fetchers, sentiment classification, idempotent ingestion and the batch
//! jobs that tie them together.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo chart, NewsAPI, Finnhub) |
//! | [`analytics`] | Day-over-day close change |
//! | [`config`] | Environment-backed application configuration |
//! | [`data_source`] | Fetcher traits and request types |
//! | [`domain`] | Validated rows and identifiers |
//! | [`error`] | Input validation errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`ingest`] | Warehouse upsert with CSV fallback |
//! | [`jobs`] | Stocks, news and insider batch runs |
//! | [`sample_size`] | A/B-test sample size calculator |
//! | [`sentiment`] | Headline classification |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Job      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Fetcher         │────▶│ HTTP Client      │
//! │ (Source traits) │     │ (reqwest/script) │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Classifier      │  news only
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ IngestionWriter │────▶│ CSV fallback     │
//! │ (upsert by id)  │     │ (store failed)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fetchers return `Ok(vec![])` for an empty result and a [`SourceError`]
//! for a failure. Store failures surface as [`IngestOutcome::FellBack`] or
//! [`IngestError`]; the only hard stop in a job is the upfront store check.
//!
//! ```rust
//! use bronzetick_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited => "slow down",
//!         SourceErrorKind::Unauthorized => "check the API key",
//!         _ => "skipped",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! API keys are read once into [`AppConfig`] and travel only in request
//! headers; they are never logged.

pub mod adapters;
pub mod analytics;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod jobs;
pub mod sample_size;
pub mod sentiment;

pub use adapters::{
    FinnhubConfig, FinnhubInsiderAdapter, NewsApiAdapter, NewsApiConfig, YahooChartAdapter,
};

pub use analytics::{close_change, AnalyticsError, CloseChange};

pub use config::{AppConfig, ConfigError};

pub use data_source::{
    DateWindow, InsiderSource, NewsQuery, NewsSource, SourceError, SourceErrorKind, SourceFuture,
    StockBarSource,
};

pub use domain::{
    format_date, parse_date, today_utc, Company, InsiderTransaction, NewsArticle, Period,
    StockBar, Symbol, UtcDateTime,
};

pub use error::ValidationError;

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

pub use ingest::{
    CsvFallbackWriter, FallbackError, FallbackFile, IngestError, IngestOutcome, IngestionWriter,
};

pub use jobs::{
    EntityCount, EntityFailure, InsiderJob, JobError, JobOutcome, JobReport, JobSink, NewsJob,
    PacingConfig, StocksJob,
};

pub use sample_size::{
    cohens_h, required_sample_size, SampleSizeError, SampleSizeInputs, SampleSizeResult,
};

pub use sentiment::{
    ChatSentimentClassifier, ClassifierConfig, LabelSet, PromptTemplate, SentimentClassifier,
    SentimentLabel,
};

// Warehouse (re-exported from bronzetick-warehouse)
pub use bronzetick_warehouse::{
    FactorCorrelation, QueryGuardrails, QueryResult, TickerFactorRow, UpsertReport, Warehouse,
    WarehouseConfig, WarehouseError, WatchlistEntry,
};
