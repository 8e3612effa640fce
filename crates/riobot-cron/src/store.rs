//! SQLite-backed job storage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::{DailyTrigger, JobRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Payload encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Stored job {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("Job store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scheduled_jobs (
    id TEXT PRIMARY KEY,
    callback TEXT NOT NULL,
    hour INTEGER NOT NULL,
    minute INTEGER NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);";

const SELECT_COLUMNS: &str = "SELECT id, callback, hour, minute, payload, created_at FROM scheduled_jobs";

/// A row as it sits on disk, before validation.
struct RawJob {
    id: String,
    callback: String,
    hour: i64,
    minute: i64,
    payload: String,
    created_at: String,
}

impl RawJob {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            callback: row.get(1)?,
            hour: row.get(2)?,
            minute: row.get(3)?,
            payload: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<JobRecord> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };
        let hour = u32::try_from(self.hour).map_err(|e| corrupt(e.to_string()))?;
        let minute = u32::try_from(self.minute).map_err(|e| corrupt(e.to_string()))?;
        let trigger = DailyTrigger::new(hour, minute).map_err(|e| corrupt(e.to_string()))?;
        let payload = serde_json::from_str(&self.payload).map_err(|e| corrupt(e.to_string()))?;
        let created_at = self
            .created_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now());
        Ok(JobRecord {
            id: self.id,
            callback: self.callback,
            trigger,
            payload,
            created_at,
        })
    }
}

/// Persistent storage for scheduled jobs.
pub struct JobStore {
    conn: Mutex<Connection>,
}

impl JobStore {
    /// Open or create a job store.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("Job store opened: {}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// List all jobs. Rows that fail to decode are logged and skipped.
    pub fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let raw = stmt
            .query_map([], RawJob::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut jobs = Vec::with_capacity(raw.len());
        for row in raw {
            match row.decode() {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("Skipping stored job: {e}"),
            }
        }
        Ok(jobs)
    }

    /// Get a job by ID.
    pub fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                rusqlite::params![id],
                RawJob::from_row,
            )
            .optional()?;
        raw.map(RawJob::decode).transpose()
    }

    /// Insert a job, replacing any existing job with the same ID.
    pub fn upsert_job(&self, job: &JobRecord) -> Result<()> {
        let payload = serde_json::to_string(&job.payload)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO scheduled_jobs (id, callback, hour, minute, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                job.id,
                job.callback,
                job.trigger.hour(),
                job.trigger.minute(),
                payload,
                job.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a job. Returns whether a row was removed.
    pub fn delete_job(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM scheduled_jobs WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(count > 0)
    }
}
