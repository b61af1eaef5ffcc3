//! Application configuration assembled once from the environment.
//!
//! Credentials are optional here; a missing key only becomes an error when a
//! collaborator that needs it is built.

use std::path::PathBuf;

use bronzetick_warehouse::{WarehouseConfig, WatchlistEntry};
use thiserror::Error;

use crate::adapters::{FinnhubConfig, NewsApiConfig};
use crate::jobs::PacingConfig;
use crate::sentiment::{ClassifierConfig, LabelSet};
use crate::{Company, Symbol, ValidationError};

pub const DEFAULT_FALLBACK_DIR: &str = "raw_data";
pub const DEFAULT_WATCHLIST: [(&str, &str); 4] = [
    ("AAPL", "Apple"),
    ("META", "Meta"),
    ("NVDA", "Nvidia"),
    ("NFLX", "Netflix"),
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {key}")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {source}")]
    Invalid {
        key: &'static str,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub news: NewsApiConfig,
    pub finnhub: FinnhubConfig,
    pub classifier: ClassifierConfig,
    pub pacing: PacingConfig,
    pub fallback_dir: PathBuf,
    pub watchlist: Vec<WatchlistEntry>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let home = get("BRONZETICK_HOME").map(PathBuf::from).unwrap_or_else(|| {
            get("HOME").map_or_else(
                || PathBuf::from(".bronzetick"),
                |home| PathBuf::from(home).join(".bronzetick"),
            )
        });
        let mut warehouse = WarehouseConfig::in_home(home);
        if let Some(db_path) = get("BRONZETICK_DB") {
            warehouse.db_path = PathBuf::from(db_path);
        }

        let news = NewsApiConfig {
            api_key: get("NEWS_API_KEY"),
            ..NewsApiConfig::default()
        };
        let finnhub = FinnhubConfig {
            api_key: get("FINNHUB_API_KEY"),
            ..FinnhubConfig::default()
        };

        let mut classifier = ClassifierConfig {
            api_key: get("GROQ_API_KEY"),
            ..ClassifierConfig::default()
        };
        if let Some(url) = get("BRONZETICK_CLASSIFIER_URL") {
            classifier.base_url = url;
        }
        if let Some(model) = get("BRONZETICK_CLASSIFIER_MODEL") {
            classifier.model = model;
        }
        if let Some(labels) = get("BRONZETICK_SENTIMENT_LABELS") {
            classifier.labels = LabelSet::parse(&labels).map_err(|source| ConfigError::Invalid {
                key: "BRONZETICK_SENTIMENT_LABELS",
                source,
            })?;
        }
        let fallback = get("BRONZETICK_SENTIMENT_FALLBACK");
        classifier.fallback_label = classifier
            .labels
            .fallback(fallback.as_deref().unwrap_or(classifier.fallback_label.as_str()))
            .map_err(|source| ConfigError::Invalid {
                key: "BRONZETICK_SENTIMENT_FALLBACK",
                source,
            })?;

        let watchlist = match get("BRONZETICK_WATCHLIST") {
            Some(raw) => parse_watchlist(&raw).map_err(|source| ConfigError::Invalid {
                key: "BRONZETICK_WATCHLIST",
                source,
            })?,
            None => default_watchlist(),
        };

        Ok(Self {
            warehouse,
            news,
            finnhub,
            classifier,
            pacing: PacingConfig::default(),
            fallback_dir: get("BRONZETICK_FALLBACK_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_FALLBACK_DIR), PathBuf::from),
            watchlist,
        })
    }

    pub fn tickers(&self) -> Vec<Symbol> {
        self.watchlist
            .iter()
            .filter_map(|entry| Symbol::parse(&entry.ticker).ok())
            .collect()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.watchlist
            .iter()
            .filter_map(|entry| Company::parse(&entry.company).ok())
            .collect()
    }
}

pub fn default_watchlist() -> Vec<WatchlistEntry> {
    DEFAULT_WATCHLIST
        .iter()
        .map(|(ticker, company)| WatchlistEntry {
            ticker: ticker.to_string(),
            company: company.to_string(),
        })
        .collect()
}

/// Parse `AAPL=Apple,META=Meta`.
pub fn parse_watchlist(input: &str) -> Result<Vec<WatchlistEntry>, ValidationError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (ticker, company) =
                part.rsplit_once('=')
                    .ok_or_else(|| ValidationError::InvalidWatchlistEntry {
                        value: part.to_string(),
                    })?;
            let ticker = Symbol::parse(ticker.trim())?;
            let company = Company::parse(company)?;
            Ok(WatchlistEntry {
                ticker: ticker.to_string(),
                company: company.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[("HOME", "/home/analyst")])).expect("config");

        assert_eq!(
            config.warehouse.db_path,
            PathBuf::from("/home/analyst/.bronzetick/warehouse.duckdb")
        );
        assert_eq!(config.fallback_dir, PathBuf::from("raw_data"));
        assert_eq!(config.news.api_key, None);
        assert_eq!(config.classifier.labels, LabelSet::three_way());
        assert_eq!(config.classifier.fallback_label.as_str(), "neutral");
        assert_eq!(config.watchlist.len(), 4);
        assert_eq!(config.tickers()[2].as_str(), "NVDA");
        assert_eq!(config.companies()[3].as_str(), "Netflix");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BRONZETICK_HOME", "/data/bt"),
            ("BRONZETICK_DB", "/tmp/other.duckdb"),
            ("NEWS_API_KEY", "n-key"),
            ("FINNHUB_API_KEY", " "),
            ("BRONZETICK_SENTIMENT_LABELS", "good,bad"),
            ("BRONZETICK_WATCHLIST", "msft=Microsoft, TSLA=Tesla"),
            ("BRONZETICK_FALLBACK_DIR", "/tmp/fallback"),
        ]))
        .expect("config");

        assert_eq!(config.warehouse.home, PathBuf::from("/data/bt"));
        assert_eq!(config.warehouse.db_path, PathBuf::from("/tmp/other.duckdb"));
        assert_eq!(config.news.api_key.as_deref(), Some("n-key"));
        assert_eq!(config.finnhub.api_key, None);
        assert_eq!(config.classifier.labels, LabelSet::two_way());
        assert_eq!(config.classifier.fallback_label.as_str(), "neutral");
        assert_eq!(config.watchlist[0].ticker, "MSFT");
        assert_eq!(config.watchlist[1].company, "Tesla");
        assert_eq!(config.fallback_dir, PathBuf::from("/tmp/fallback"));
    }

    #[test]
    fn watchlist_accepts_currency_and_index_tickers() {
        let entries = parse_watchlist("EURUSD=X=Euro, ^GSPC=S&P 500").expect("watchlist");

        assert_eq!(entries[0].ticker, "EURUSD=X");
        assert_eq!(entries[0].company, "Euro");
        assert_eq!(entries[1].ticker, "^GSPC");
        assert_eq!(entries[1].company, "S&P 500");
    }

    #[test]
    fn invalid_values_name_the_setting() {
        let labels = AppConfig::from_lookup(lookup(&[("BRONZETICK_SENTIMENT_LABELS", "good")]));
        assert!(matches!(
            labels,
            Err(ConfigError::Invalid {
                key: "BRONZETICK_SENTIMENT_LABELS",
                ..
            })
        ));

        let watchlist = AppConfig::from_lookup(lookup(&[("BRONZETICK_WATCHLIST", "AAPL")]));
        assert!(matches!(
            watchlist,
            Err(ConfigError::Invalid {
                key: "BRONZETICK_WATCHLIST",
                ..
            })
        ));
    }
}
