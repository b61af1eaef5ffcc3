use thiserror::Error;

/// Validation errors for domain inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("company name cannot be empty")]
    EmptyCompany,
    #[error("news query cannot be empty")]
    EmptyQuery,

    #[error("invalid period '{value}', expected one of {expected}")]
    InvalidPeriod {
        value: String,
        expected: &'static str,
    },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range starts after it ends: {from} > {to}")]
    InvertedDateRange { from: String, to: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("sentiment labels must be at least two distinct non-empty words: '{value}'")]
    InvalidLabelSet { value: String },
    #[error("fallback label '{label}' is not one of the configured labels")]
    UnknownFallbackLabel { label: String },
    #[error("watchlist entry must be TICKER=Company: '{value}'")]
    InvalidWatchlistEntry { value: String },
}
