//! Store-or-fallback persistence for fetched batches.
//!
//! [`IngestionWriter::persist`] upserts into the warehouse and, when that
//! fails, rewrites the batch to a CSV file in the fallback directory so the
//! fetched rows are not lost.

use std::fs;
use std::path::{Path, PathBuf};

use bronzetick_warehouse::{
    IngestRecord, InsiderTransactionRecord, NewsRecord, StockBarRecord, UpsertReport, Warehouse,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Record types that have a fallback CSV file.
pub trait FallbackFile: IngestRecord + Serialize {
    const FILE_NAME: &'static str;
}

impl FallbackFile for StockBarRecord {
    const FILE_NAME: &'static str = "stock_data.csv";
}

impl FallbackFile for NewsRecord {
    const FILE_NAME: &'static str = "news_data_with_sentiment_backup.csv";
}

impl FallbackFile for InsiderTransactionRecord {
    const FILE_NAME: &'static str = "insider_transactions.csv";
}

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("store write failed ({store_error}) and the fallback write failed too: {fallback_error}")]
    FallbackFailed {
        store_error: String,
        #[source]
        fallback_error: FallbackError,
    },
}

/// Writes batches as CSV, one file per record type, replacing any previous
/// file. Columns follow the record's field order; the id is not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFallbackWriter {
    dir: PathBuf,
}

impl CsvFallbackWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<R: FallbackFile>(&self) -> PathBuf {
        self.dir.join(R::FILE_NAME)
    }

    pub fn write<R: FallbackFile>(&self, rows: &[R]) -> Result<PathBuf, FallbackError> {
        let path = self.path_for::<R>();
        fs::create_dir_all(&self.dir).map_err(|source| FallbackError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let csv_error = |source| FallbackError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| FallbackError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = rows.len(), "batch written to csv");
        Ok(path)
    }
}

/// Which path a batch took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Stored(UpsertReport),
    FellBack {
        path: PathBuf,
        rows: usize,
        store_error: String,
    },
}

/// Warehouse upsert with CSV fallback.
#[derive(Debug, Clone)]
pub struct IngestionWriter {
    warehouse: Warehouse,
    fallback: CsvFallbackWriter,
}

impl IngestionWriter {
    pub fn new(warehouse: Warehouse, fallback: CsvFallbackWriter) -> Self {
        Self {
            warehouse,
            fallback,
        }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn fallback(&self) -> &CsvFallbackWriter {
        &self.fallback
    }

    /// An empty batch touches neither the store nor the fallback file.
    pub fn persist<R: FallbackFile>(&self, rows: &[R]) -> Result<IngestOutcome, IngestError> {
        if rows.is_empty() {
            return Ok(IngestOutcome::Stored(UpsertReport::empty(R::TABLE)));
        }

        match self.warehouse.upsert_batch(rows) {
            Ok(report) => Ok(IngestOutcome::Stored(report)),
            Err(error) => {
                let store_error = error.to_string();
                warn!(table = R::TABLE, error = %store_error, "store write failed, writing fallback file");
                match self.fallback.write(rows) {
                    Ok(path) => Ok(IngestOutcome::FellBack {
                        path,
                        rows: rows.len(),
                        store_error,
                    }),
                    Err(fallback_error) => Err(IngestError::FallbackFailed {
                        store_error,
                        fallback_error,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bronzetick_warehouse::WarehouseConfig;

    fn bar(date: &str, close: f64) -> StockBarRecord {
        StockBarRecord {
            ticker: String::from("AAPL"),
            date: date.to_string(),
            open: 10.0,
            high: 12.5,
            low: 9.75,
            close,
            volume: 1_000,
        }
    }

    fn broken_store(dir: &Path) -> Warehouse {
        let blocker = dir.join("not-a-db");
        fs::create_dir_all(&blocker).expect("blocker dir");
        Warehouse::new(WarehouseConfig {
            home: dir.to_path_buf(),
            db_path: blocker,
        })
    }

    #[test]
    fn stores_batches_when_the_store_is_healthy() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::in_home(tmp.path().join("home"))).expect("warehouse");
        let writer = IngestionWriter::new(warehouse, CsvFallbackWriter::new(tmp.path().join("raw")));

        let outcome = writer
            .persist(&[bar("2024-01-02", 11.0), bar("2024-01-03", 11.5)])
            .expect("persist");

        match outcome {
            IngestOutcome::Stored(report) => assert_eq!(report.inserted, 2),
            other => panic!("expected stored, got {other:?}"),
        }
        assert!(!tmp.path().join("raw").exists());
    }

    #[test]
    fn falls_back_to_csv_in_input_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let writer = IngestionWriter::new(
            broken_store(tmp.path()),
            CsvFallbackWriter::new(tmp.path().join("raw")),
        );

        let outcome = writer
            .persist(&[bar("2024-01-03", 11.5), bar("2024-01-02", 11.0)])
            .expect("fallback");

        let IngestOutcome::FellBack { path, rows, .. } = outcome else {
            panic!("expected fallback");
        };
        assert_eq!(rows, 2);
        assert_eq!(path, tmp.path().join("raw").join("stock_data.csv"));
        let contents = fs::read_to_string(path).expect("csv");
        assert_eq!(
            contents,
            "ticker,date,open,high,low,close,volume\n\
             AAPL,2024-01-03,10.0,12.5,9.75,11.5,1000\n\
             AAPL,2024-01-02,10.0,12.5,9.75,11.0,1000\n"
        );
    }

    #[test]
    fn fallback_file_is_replaced_on_each_write() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fallback = CsvFallbackWriter::new(tmp.path());

        fallback
            .write(&[bar("2024-01-02", 1.0), bar("2024-01-03", 2.0)])
            .expect("first");
        let path = fallback.write(&[bar("2024-01-04", 3.0)]).expect("second");

        let contents = fs::read_to_string(path).expect("csv");
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("2024-01-04"));
    }

    #[test]
    fn news_fallback_writes_empty_optional_fields() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fallback = CsvFallbackWriter::new(tmp.path());
        let record = NewsRecord {
            company: String::from("Apple"),
            title: String::from("Apple, Inc. \"beats\""),
            description: None,
            url: None,
            published_at: String::from("2024-01-02T15:04:05Z"),
            sentiment: String::from("good"),
        };

        let path = fallback.write(&[record]).expect("write");

        assert!(path.ends_with("news_data_with_sentiment_backup.csv"));
        let contents = fs::read_to_string(path).expect("csv");
        assert_eq!(
            contents,
            "company,title,description,url,published_at,sentiment\n\
             Apple,\"Apple, Inc. \"\"beats\"\"\",,,2024-01-02T15:04:05Z,good\n"
        );
    }

    #[test]
    fn reports_both_errors_when_fallback_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file_in_the_way = tmp.path().join("raw");
        fs::write(&file_in_the_way, "occupied").expect("file");
        let writer = IngestionWriter::new(broken_store(tmp.path()), CsvFallbackWriter::new(&file_in_the_way));

        let error = writer.persist(&[bar("2024-01-02", 1.0)]).expect_err("both fail");

        let IngestError::FallbackFailed { store_error, .. } = error;
        assert!(!store_error.is_empty());
    }

    #[test]
    fn empty_batches_touch_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let writer = IngestionWriter::new(
            broken_store(tmp.path()),
            CsvFallbackWriter::new(tmp.path().join("raw")),
        );

        let outcome = writer.persist::<StockBarRecord>(&[]).expect("no-op");

        assert_eq!(outcome, IngestOutcome::Stored(UpsertReport::empty("stocks")));
        assert!(!tmp.path().join("raw").exists());
    }
}
