use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use picomon_core::StatusSample;

/// One persisted reading, as served to the history chart.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogRecord {
    pub id: i64,
    pub raw: i64,
    pub temperature: f64,
    pub led: i64,
    pub timestamp: DateTime<Utc>,
}

/// Opens the reading log, creating the file and schema as needed. Falls back
/// to an in-memory database when the path cannot be opened so the dashboard
/// still serves live readings.
pub async fn init_db(path: &str) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let url = format!("sqlite://{}?mode=rwc", path);
    let pool = match SqlitePoolOptions::new().max_connections(5).connect(&url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = ?e, "Failed to open SQLite at path; falling back to in-memory DB");
            SqlitePoolOptions::new().max_connections(5).connect("sqlite::memory:").await?
        }
    };
    // WAL for better concurrency
    let _ = sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Creates the log table and its timestamp index when missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            raw INTEGER NOT NULL,
            temperature REAL NOT NULL,
            led INTEGER NOT NULL DEFAULT 0,
            timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_log_timestamp ON log(timestamp DESC);")
        .execute(pool)
        .await?;
    Ok(())
}

/// Query layer over the reading log.
#[derive(Clone)]
pub struct HistoryStore {
    db: SqlitePool,
}

impl HistoryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Timestamp of the newest persisted reading, if any.
    pub async fn last_sample_time(&self) -> Result<Option<DateTime<Utc>>> {
        let ts = sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(timestamp) FROM log")
            .fetch_one(&self.db)
            .await?;
        Ok(ts)
    }

    pub async fn append(&self, sample: &StatusSample) -> Result<i64> {
        let res =
            sqlx::query("INSERT INTO log (raw, temperature, led, timestamp) VALUES (?, ?, ?, ?)")
                .bind(sample.raw)
                .bind(sample.temperature)
                .bind(sample.led as i64)
                .bind(sample.timestamp)
                .execute(&self.db)
                .await?;
        Ok(res.last_insert_rowid())
    }

    /// The newest `limit` readings in chronological order, ready to chart.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>> {
        let mut rows = sqlx::query_as::<_, LogRecord>(
            "SELECT id, raw, temperature, led, timestamp FROM log ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;
        rows.reverse();
        Ok(rows)
    }
}
