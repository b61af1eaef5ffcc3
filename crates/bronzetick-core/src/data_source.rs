//! Fetcher contracts shared by every provider adapter.
//!
//! | Trait | Request | Rows |
//! |-------|---------|------|
//! | [`StockBarSource`] | [`Symbol`] + [`Period`] | [`StockBar`] |
//! | [`NewsSource`] | [`NewsQuery`] | [`NewsArticle`] |
//! | [`InsiderSource`] | [`Symbol`] + [`DateWindow`] | [`InsiderTransaction`] |
//!
//! Fetchers validate input before touching the network. `Ok(vec![])` means
//! the provider had nothing for the request; it is never used to hide an
//! error.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use time::Date;

use crate::domain::format_date;
use crate::http_client::{HttpError, HttpResponse};
use crate::{
    Company, InsiderTransaction, NewsArticle, Period, StockBar, Symbol, ValidationError,
};

/// Boxed future returned by fetchers and classifiers.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Fetch-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    InvalidRequest,
    Unauthorized,
    RateLimited,
    Unavailable,
    Upstream,
    Malformed,
}

/// Structured error returned by fetchers and the sentiment classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message, false)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unauthorized, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message, true)
    }

    /// The provider answered but reported an error of its own.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Upstream, message, false)
    }

    /// The response could not be understood.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message, false)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// Classify a non-success HTTP status from `provider`.
    pub fn from_status(provider: &str, response: &HttpResponse) -> Self {
        match response.status {
            401 | 403 => Self::unauthorized(format!(
                "{provider} rejected the credentials (status {})",
                response.status
            )),
            429 => Self::rate_limited(format!("{provider} rate limit reached (status 429)")),
            status => Self::unavailable(format!("{provider} returned status {status}")),
        }
    }

    pub fn from_transport(provider: &str, error: &HttpError) -> Self {
        if error.retryable() {
            Self::unavailable(format!("{provider} transport error: {}", error.message()))
        } else {
            Self::invalid_request(format!("{provider} transport error: {}", error.message()))
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Upstream => "source.upstream",
            SourceErrorKind::Malformed => "source.malformed",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Date,
    pub to: Date,
}

impl DateWindow {
    pub fn new(from: Date, to: Date) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvertedDateRange {
                from: format_date(from),
                to: format_date(to),
            });
        }
        Ok(Self { from, to })
    }

    pub fn single_day(day: Date) -> Self {
        Self { from: day, to: day }
    }
}

/// Request payload for news searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub company: Company,
    /// Free-text search; defaults to the company name.
    pub query: String,
    /// Oldest publication date to include.
    pub from: Date,
}

impl NewsQuery {
    pub fn for_company(company: Company, from: Date) -> Self {
        let query = company.as_str().to_string();
        Self {
            company,
            query,
            from,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Result<Self, ValidationError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        self.query = query.trim().to_string();
        Ok(self)
    }
}

/// Daily price history.
pub trait StockBarSource: Send + Sync {
    fn daily_bars<'a>(&'a self, ticker: &'a Symbol, period: Period) -> SourceFuture<'a, Vec<StockBar>>;
}

/// News search.
pub trait NewsSource: Send + Sync {
    fn articles<'a>(&'a self, query: &'a NewsQuery) -> SourceFuture<'a, Vec<NewsArticle>>;
}

/// Insider filings.
pub trait InsiderSource: Send + Sync {
    fn insider_transactions<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: DateWindow,
    ) -> SourceFuture<'a, Vec<InsiderTransaction>>;
}
