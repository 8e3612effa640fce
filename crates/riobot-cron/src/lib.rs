//! riobot-cron: Persistent daily job scheduling.
//!
//! Jobs are registered against a named callback with a daily `HH:MM`
//! trigger and an opaque JSON payload. Registration persists the job to
//! SQLite; the scheduler reloads persisted jobs on start.

pub mod scheduler;
pub mod store;
pub mod trigger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use scheduler::{
    Clock, JobCallback, Scheduler, SchedulerError, SchedulerOptions, SystemClock,
};
pub use store::{JobStore, StoreError};
pub use trigger::{DailyTrigger, TriggerError};

/// A persisted scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job ID.
    pub id: String,
    /// Name of the registered callback invoked on each fire.
    pub callback: String,
    /// When the job fires.
    pub trigger: DailyTrigger,
    /// Keyword payload handed back to the callback.
    pub payload: serde_json::Value,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// A job registration request.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub callback: String,
    pub trigger: DailyTrigger,
    pub payload: serde_json::Value,
}
