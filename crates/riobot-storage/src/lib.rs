//! riobot-storage: SQLite-based persistence for bot settings.
//!
//! Holds per-group feature toggles. Scheduled jobs live in the
//! `riobot-cron` job store; both may share one database file.

use std::path::Path;
use std::sync::Arc;

use riobot_types::GroupId;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS group_settings (
    group_id INTEGER PRIMARY KEY,
    reminders_enabled INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);";

/// A stored per-group setting row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GroupSetting {
    pub group_id: GroupId,
    pub reminders_enabled: bool,
    /// Unix milliseconds of the last change.
    pub updated_at: i64,
}

/// SQLite-based storage for bot settings.
pub struct BotStorage {
    conn: Arc<Mutex<Connection>>,
}

impl BotStorage {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Storage opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ─── Group Settings ─────────────────────────────────────

    /// Record whether reminders are enabled in a group.
    pub async fn set_group_enabled(&self, group_id: GroupId, enabled: bool) -> Result<()> {
        let conn = self.conn.clone();
        let now = chrono::Utc::now().timestamp_millis();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO group_settings (group_id, reminders_enabled, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(group_id) DO UPDATE SET
                    reminders_enabled = excluded.reminders_enabled,
                    updated_at = excluded.updated_at",
                rusqlite::params![group_id, enabled as i32, now],
            )?;
            Ok(())
        })
        .await?
    }

    /// The stored toggle for a group, if one was ever written.
    pub async fn get_group_enabled(&self, group_id: GroupId) -> Result<Option<bool>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let result = conn
                .query_row(
                    "SELECT reminders_enabled FROM group_settings WHERE group_id = ?1",
                    rusqlite::params![group_id],
                    |row| Ok(row.get::<_, i32>(0)? != 0),
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }

    /// List every stored group setting, ordered by group.
    pub async fn list_group_settings(&self) -> Result<Vec<GroupSetting>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT group_id, reminders_enabled, updated_at
                 FROM group_settings ORDER BY group_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GroupSetting {
                        group_id: row.get(0)?,
                        reminders_enabled: row.get::<_, i32>(1)? != 0,
                        updated_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }
}
