//! Startup reconciliation and shutdown.

use riobot_cron::JobRecord;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::id::{JOB_ID_PREFIX, parse_job_id};
use crate::model::{ReminderJob, ReminderPayload};
use crate::service::ReminderService;

/// Outcome of rebuilding the cache from persisted jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub recovered: usize,
    pub skipped: usize,
}

impl ReminderService {
    /// Load group settings, start the scheduler and recover cached reminders.
    pub async fn startup(&self) -> Result<RecoveryReport> {
        match self.settings.load().await {
            Ok(count) => debug!("Loaded {count} group settings"),
            Err(e) => warn!("Failed to load group settings, using defaults: {e}"),
        }

        self.scheduler.start().await?;
        let report = self.recover().await;
        info!(
            recovered = report.recovered,
            skipped = report.skipped,
            "Reminder system started"
        );
        Ok(report)
    }

    /// Rebuild the cache from the scheduler's jobs. A job that cannot be
    /// decoded is logged and skipped.
    pub async fn recover(&self) -> RecoveryReport {
        let mut report = RecoveryReport::default();
        let prefix = format!("{JOB_ID_PREFIX}_");

        for record in self.scheduler.get_jobs().await {
            if !record.id.starts_with(&prefix) {
                continue;
            }
            match restore_job(&record) {
                Ok(job) => {
                    self.cache.insert(job).await;
                    report.recovered += 1;
                }
                Err(reason) => {
                    warn!(job_id = %record.id, "Failed to recover reminder: {reason}");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        info!("Reminder system stopped");
    }
}

fn restore_job(record: &JobRecord) -> std::result::Result<ReminderJob, String> {
    let parsed = parse_job_id(&record.id).map_err(|e| e.to_string())?;
    let payload: ReminderPayload =
        serde_json::from_value(record.payload.clone()).map_err(|e| e.to_string())?;
    if payload.content.trim().is_empty() {
        return Err("empty content".to_string());
    }

    Ok(ReminderJob {
        id: record.id.clone(),
        scope: parsed.scope,
        trigger: record.trigger,
        targets: payload.targets,
        content: payload.content,
        creator: payload.creator,
        display_time: parsed.trigger.to_string(),
    })
}
