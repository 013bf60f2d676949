//! Result persistence
//!
//! Results land in a single SQLite table keyed by the requested URL. The
//! store is owned by the result sink, which is the only writer.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::ScrapeResult;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Duplicate requested URL: {0}")]
    Duplicate(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

const CREATE_RESULTS: &str = "CREATE TABLE IF NOT EXISTS results (
    requested_url TEXT NOT NULL PRIMARY KEY,
    html TEXT,
    error TEXT,
    cookies TEXT,
    status_code INT,
    status_text TEXT,
    resolved_url TEXT,
    duration_ms INT NOT NULL
)";

const INSERT_RESULT: &str = "INSERT INTO results
    (requested_url, html, error, cookies, status_code, status_text, resolved_url, duration_ms)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Sink-facing persistence contract
pub trait ResultStore: Send + 'static {
    /// Insert one result. A duplicate requested URL is an error, not an upsert.
    fn insert(&mut self, result: &ScrapeResult) -> Result<()>;
}

/// SQLite-backed result store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening result store at: {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the results table if needed and delete every row.
    /// Each run starts from an empty table.
    pub fn reset(&self) -> Result<()> {
        self.conn.execute(CREATE_RESULTS, [])?;
        let removed = self.conn.execute("DELETE FROM results", [])?;
        info!(removed, "Result table reset");
        Ok(())
    }

    /// Number of persisted rows
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch a persisted result by requested URL
    pub fn get(&self, requested_url: &str) -> Result<Option<ScrapeResult>> {
        let row = self
            .conn
            .query_row(
                "SELECT requested_url, html, error, cookies, status_code, status_text, resolved_url, duration_ms
                 FROM results WHERE requested_url = ?1",
                params![requested_url],
                |row| {
                    Ok(ScrapeResult {
                        requested_url: row.get(0)?,
                        body: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        error: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        cookies: row.get(3)?,
                        status_code: row.get(4)?,
                        status_text: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                        resolved_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                        duration_ms: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// All persisted requested URLs, sorted
    pub fn requested_urls(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT requested_url FROM results ORDER BY requested_url")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(urls)
    }
}

impl ResultStore for SqliteStore {
    fn insert(&mut self, result: &ScrapeResult) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(INSERT_RESULT)?;
        stmt.execute(params![
            result.requested_url,
            result.body,
            result.error,
            result.cookies,
            result.status_code,
            result.status_text,
            result.resolved_url,
            result.duration_ms,
        ])
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::Duplicate(result.requested_url.clone())
            }
            other => StorageError::Sqlite(other),
        })?;
        Ok(())
    }
}
