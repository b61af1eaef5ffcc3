//! Batch jobs: stocks, news and insider transactions.
//!
//! Every job follows the same sequence:
//!
//! 1. When storing, check and initialize the store. Failure aborts the job
//!    before any provider is called.
//! 2. Fetch each entity in order, pausing between entities. A failing entity
//!    is recorded and the job moves on.
//! 3. News only: classify each article, pausing after every call. A failed
//!    classification uses the fallback label and records a warning.
//! 4. Persist the combined batch, or export it as CSV when storing is off.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bronzetick_warehouse::{UpsertReport, WarehouseError, WatchlistEntry};
use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::{debug, info, warn};

use crate::data_source::{DateWindow, InsiderSource, NewsQuery, NewsSource, SourceError, StockBarSource};
use crate::ingest::{
    CsvFallbackWriter, FallbackError, FallbackFile, IngestError, IngestOutcome, IngestionWriter,
};
use crate::sentiment::{SentimentClassifier, SentimentLabel};
use crate::{Company, Period, Symbol};

/// Fixed pauses used as the only rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Between consecutive entities.
    pub entity_delay: Duration,
    /// After each classifier call.
    pub item_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            entity_delay: Duration::from_secs(2),
            item_delay: Duration::from_millis(500),
        }
    }
}

impl PacingConfig {
    pub const fn none() -> Self {
        Self {
            entity_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
        }
    }

    /// Sleeps for `entity_delay`. Call before every entity but the first.
    pub async fn between_entities(&self) {
        pause(self.entity_delay).await;
    }

    /// Sleeps for `item_delay`.
    pub async fn after_item(&self) {
        pause(self.item_delay).await;
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("store is unreachable, nothing was fetched: {0}")]
    StoreUnreachable(#[source] WarehouseError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("csv export failed: {0}")]
    Export(#[from] FallbackError),
}

/// Where a job's rows end up.
#[derive(Debug, Clone)]
pub enum JobSink {
    Store {
        writer: IngestionWriter,
        watchlist: Vec<WatchlistEntry>,
    },
    Export(CsvFallbackWriter),
}

impl JobSink {
    fn prepare(&self) -> Result<(), JobError> {
        let Self::Store { writer, watchlist } = self else {
            return Ok(());
        };
        let warehouse = writer.warehouse();
        let status = warehouse
            .check_connectivity()
            .map_err(JobError::StoreUnreachable)?;
        warehouse
            .initialize()
            .and_then(|()| warehouse.register_watchlist(watchlist))
            .map_err(|error| {
                JobError::StoreUnreachable(WarehouseError::Unreachable {
                    path: status.db_path.clone(),
                    reason: error.to_string(),
                })
            })?;
        debug!(db = %status.db_path.display(), version = %status.version, "store ready");
        Ok(())
    }

    fn finish<R: FallbackFile>(&self, rows: &[R]) -> Result<JobOutcome, JobError> {
        if rows.is_empty() {
            return Ok(JobOutcome::NothingCollected);
        }
        match self {
            Self::Store { writer, .. } => Ok(writer.persist(rows)?.into()),
            Self::Export(csv) => {
                let path = csv.write(rows)?;
                Ok(JobOutcome::Exported {
                    path,
                    rows: rows.len(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    NothingCollected,
    Stored(UpsertReport),
    FellBack {
        path: PathBuf,
        rows: usize,
        store_error: String,
    },
    Exported {
        path: PathBuf,
        rows: usize,
    },
}

impl From<IngestOutcome> for JobOutcome {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Stored(report) => Self::Stored(report),
            IngestOutcome::FellBack {
                path,
                rows,
                store_error,
            } => Self::FellBack {
                path,
                rows,
                store_error,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub entity: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    pub entity: String,
    pub code: &'static str,
    pub message: String,
}

impl EntityFailure {
    fn new(entity: &str, error: &SourceError) -> Self {
        Self {
            entity: entity.to_string(),
            code: error.code(),
            message: error.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    pub fetched: usize,
    pub entities: Vec<EntityCount>,
    pub failures: Vec<EntityFailure>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<BTreeMap<String, usize>>,
    pub outcome: JobOutcome,
}

/// Per-entity fetch loop shared by the jobs.
struct Collected<T> {
    rows: Vec<T>,
    entities: Vec<EntityCount>,
    failures: Vec<EntityFailure>,
}

async fn collect<'e, E, T, F, Fut>(
    job: &'static str,
    entities: &'e [E],
    name_of: fn(&E) -> &str,
    pacing: PacingConfig,
    mut fetch: F,
) -> Collected<T>
where
    F: FnMut(&'e E) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>, SourceError>>,
{
    let mut collected = Collected {
        rows: Vec::new(),
        entities: Vec::with_capacity(entities.len()),
        failures: Vec::new(),
    };

    for (index, entity) in entities.iter().enumerate() {
        if index > 0 {
            pacing.between_entities().await;
        }
        let name = name_of(entity);
        match fetch(entity).await {
            Ok(rows) => {
                debug!(job, entity = name, rows = rows.len(), "entity fetched");
                collected.entities.push(EntityCount {
                    entity: name.to_string(),
                    rows: rows.len(),
                });
                collected.rows.extend(rows);
            }
            Err(error) => {
                warn!(job, entity = name, code = error.code(), error = %error, "entity fetch failed");
                collected.failures.push(EntityFailure::new(name, &error));
            }
        }
    }

    collected
}

/// Daily bars for a list of tickers.
pub struct StocksJob {
    source: Arc<dyn StockBarSource>,
    sink: JobSink,
    pacing: PacingConfig,
    period: Period,
}

impl StocksJob {
    pub fn new(source: Arc<dyn StockBarSource>, sink: JobSink, pacing: PacingConfig) -> Self {
        Self {
            source,
            sink,
            pacing,
            period: Period::default(),
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub async fn run(&self, tickers: &[Symbol]) -> Result<JobReport, JobError> {
        self.sink.prepare()?;
        info!(
            job = "stocks",
            entities = tickers.len(),
            period = self.period.as_str(),
            "job started"
        );

        let period = self.period;
        let collected = collect(
            "stocks",
            tickers,
            Symbol::as_str,
            self.pacing,
            |ticker| self.source.daily_bars(ticker, period),
        )
        .await;

        let records: Vec<_> = collected.rows.iter().map(|bar| bar.to_record()).collect();
        let outcome = self.sink.finish(&records)?;
        Ok(finish_report(
            "stocks",
            records.len(),
            collected.entities,
            collected.failures,
            Vec::new(),
            None,
            outcome,
        ))
    }
}

/// Company news, classified before storage.
pub struct NewsJob {
    source: Arc<dyn NewsSource>,
    classifier: Arc<dyn SentimentClassifier>,
    fallback_label: SentimentLabel,
    sink: JobSink,
    pacing: PacingConfig,
    from: Date,
}

impl NewsJob {
    pub fn new(
        source: Arc<dyn NewsSource>,
        classifier: Arc<dyn SentimentClassifier>,
        fallback_label: SentimentLabel,
        sink: JobSink,
        pacing: PacingConfig,
        from: Date,
    ) -> Self {
        Self {
            source,
            classifier,
            fallback_label,
            sink,
            pacing,
            from,
        }
    }

    pub async fn run(&self, companies: &[Company]) -> Result<JobReport, JobError> {
        self.sink.prepare()?;
        info!(job = "news", entities = companies.len(), "job started");

        let queries: Vec<NewsQuery> = companies
            .iter()
            .map(|company| NewsQuery::for_company(company.clone(), self.from))
            .collect();
        let collected = collect(
            "news",
            &queries,
            |query| query.company.as_str(),
            self.pacing,
            |query| self.source.articles(query),
        )
        .await;

        let mut warnings = Vec::new();
        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut records = Vec::with_capacity(collected.rows.len());
        for article in &collected.rows {
            let label = match self.classifier.classify(article.classification_text()).await {
                Ok(label) => label,
                Err(error) => {
                    warn!(
                        company = article.company.as_str(),
                        code = error.code(),
                        error = %error,
                        "classification failed, using fallback label"
                    );
                    warnings.push(format!(
                        "{}: '{}' classified as {} ({})",
                        article.company, article.title, self.fallback_label, error
                    ));
                    self.fallback_label.clone()
                }
            };
            self.pacing.after_item().await;
            *distribution.entry(label.to_string()).or_default() += 1;
            records.push(article.to_record(label.as_str()));
        }

        let outcome = self.sink.finish(&records)?;
        Ok(finish_report(
            "news",
            records.len(),
            collected.entities,
            collected.failures,
            warnings,
            Some(distribution),
            outcome,
        ))
    }
}

/// Insider filings for a list of tickers over one date window.
pub struct InsiderJob {
    source: Arc<dyn InsiderSource>,
    sink: JobSink,
    pacing: PacingConfig,
    window: DateWindow,
}

impl InsiderJob {
    pub fn new(
        source: Arc<dyn InsiderSource>,
        sink: JobSink,
        pacing: PacingConfig,
        window: DateWindow,
    ) -> Self {
        Self {
            source,
            sink,
            pacing,
            window,
        }
    }

    pub async fn run(&self, symbols: &[Symbol]) -> Result<JobReport, JobError> {
        self.sink.prepare()?;
        info!(job = "insider", entities = symbols.len(), "job started");

        let window = self.window;
        let collected = collect(
            "insider",
            symbols,
            Symbol::as_str,
            self.pacing,
            |symbol| self.source.insider_transactions(symbol, window),
        )
        .await;

        let records: Vec<_> = collected.rows.iter().map(|row| row.to_record()).collect();
        let outcome = self.sink.finish(&records)?;
        Ok(finish_report(
            "insider",
            records.len(),
            collected.entities,
            collected.failures,
            Vec::new(),
            None,
            outcome,
        ))
    }
}

fn finish_report(
    job: &'static str,
    fetched: usize,
    entities: Vec<EntityCount>,
    failures: Vec<EntityFailure>,
    warnings: Vec<String>,
    sentiment: Option<BTreeMap<String, usize>>,
    outcome: JobOutcome,
) -> JobReport {
    info!(
        job,
        fetched,
        failures = failures.len(),
        warnings = warnings.len(),
        "job finished"
    );
    JobReport {
        job,
        fetched,
        entities,
        failures,
        warnings,
        sentiment,
        outcome,
    }
}
