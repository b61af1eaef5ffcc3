//! `DuckDB` connections opened per operation.
//!
//! Every check, migration run, batch write and query gets its own connection,
//! which is closed when dropped. Nothing is pooled between operations.

use std::path::{Path, PathBuf};

use ::duckdb::Connection;

/// Access mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

/// Opens configured connections to one database file.
#[derive(Debug, Clone)]
pub struct DuckDbConnector {
    db_path: PathBuf,
}

impl DuckDbConnector {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
        }
    }

    /// Open a fresh connection in the requested mode.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn connect(&self, mode: AccessMode) -> Result<Connection, ::duckdb::Error> {
        let connection = Connection::open(self.db_path.as_path())?;
        configure_connection(&connection, mode)?;
        Ok(connection)
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }
}

fn configure_connection(connection: &Connection, mode: AccessMode) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    if mode == AccessMode::ReadOnly {
        // Not accepted once the database is attached; the query layer still
        // rejects writes in read-only mode.
        let _ = connection.execute_batch("SET access_mode = 'READ_ONLY';");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn each_connect_call_opens_an_independent_connection() {
        let temp = tempdir().expect("tempdir");
        let connector = DuckDbConnector::new(temp.path().join("store.duckdb"));

        let writer = connector.connect(AccessMode::ReadWrite).expect("writer");
        writer
            .execute_batch("CREATE TABLE scratch (value INTEGER); INSERT INTO scratch VALUES (7);")
            .expect("seed");
        drop(writer);

        let reader = connector.connect(AccessMode::ReadOnly).expect("reader");
        let value: i64 = reader
            .query_row("SELECT value FROM scratch", [], |row| row.get(0))
            .expect("read back");
        assert_eq!(value, 7);
        assert!(connector.db_path().ends_with("store.duckdb"));
    }
}
