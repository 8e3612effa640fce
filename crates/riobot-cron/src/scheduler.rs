//! Job scheduler: keeps next-fire times in memory and dispatches due jobs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{JobStore, StoreError};
use crate::{JobRecord, NewJob};

/// Upper bound on a single idle wait, so clock changes are picked up.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Async callback invoked with the job on every fire.
pub type JobCallback =
    Arc<dyn Fn(JobRecord) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    NotFound(String),
    #[error("No callback registered under {0:?}")]
    UnknownCallback(String),
    #[error("Scheduler is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// A fire observed later than this after its scheduled time is skipped.
    pub misfire_grace: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            misfire_grace: Duration::from_secs(60),
        }
    }
}

struct ScheduledJob {
    record: JobRecord,
    next_run: Option<DateTime<Local>>,
}

impl ScheduledJob {
    fn new(record: JobRecord, now: &DateTime<Local>) -> Self {
        let next_run = record.trigger.next_after(now);
        Self { record, next_run }
    }
}

#[derive(Default)]
struct RunState {
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

/// Persistent daily scheduler.
///
/// Every mutation writes through to the [`JobStore`] before the in-memory
/// view changes, so a failed write leaves the previous registration intact.
pub struct Scheduler {
    store: Arc<JobStore>,
    options: SchedulerOptions,
    clock: Arc<dyn Clock>,
    jobs: RwLock<HashMap<String, ScheduledJob>>,
    callbacks: RwLock<HashMap<String, JobCallback>>,
    wakeup: Notify,
    state: Mutex<RunState>,
}

impl Scheduler {
    pub fn new(store: Arc<JobStore>, options: SchedulerOptions) -> Self {
        Self {
            store,
            options,
            clock: Arc::new(SystemClock),
            jobs: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(HashMap::new()),
            wakeup: Notify::new(),
            state: Mutex::new(RunState::default()),
        }
    }

    /// Read the time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a callback that jobs can reference by name.
    pub async fn register_callback(&self, name: impl Into<String>, callback: JobCallback) {
        let name = name.into();
        debug!(callback = %name, "Registered job callback");
        self.callbacks.write().await.insert(name, callback);
    }

    /// Add a job, atomically replacing any job with the same ID.
    pub async fn add_job(&self, job: NewJob) -> Result<JobRecord> {
        if !self.callbacks.read().await.contains_key(&job.callback) {
            return Err(SchedulerError::UnknownCallback(job.callback));
        }

        let record = JobRecord {
            id: job.id,
            callback: job.callback,
            trigger: job.trigger,
            payload: job.payload,
            created_at: Utc::now(),
        };

        let mut jobs = self.jobs.write().await;
        self.store.upsert_job(&record)?;
        let replaced = jobs
            .insert(
                record.id.clone(),
                ScheduledJob::new(record.clone(), &self.clock.now()),
            )
            .is_some();
        drop(jobs);

        info!(job_id = %record.id, trigger = %record.trigger, replaced, "Job added");
        self.wakeup.notify_one();
        Ok(record)
    }

    /// Remove a job from the store and the schedule.
    pub async fn remove_job(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let deleted = self.store.delete_job(id)?;
        let unscheduled = jobs.remove(id).is_some();
        drop(jobs);

        if !deleted && !unscheduled {
            return Err(SchedulerError::NotFound(id.to_string()));
        }
        info!(job_id = %id, "Job removed");
        self.wakeup.notify_one();
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(id).map(|j| j.record.clone())
    }

    /// All scheduled jobs, ordered by ID.
    pub async fn get_jobs(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().await;
        let mut records: Vec<JobRecord> = jobs.values().map(|j| j.record.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub async fn next_run_time(&self, id: &str) -> Option<DateTime<Local>> {
        self.jobs.read().await.get(id).and_then(|j| j.next_run)
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.handle.is_some()
    }

    /// Load persisted jobs and start the background loop.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.handle.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let loaded = self.load(self.clock.now()).await?;
        info!("Loaded {loaded} scheduled jobs");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run_loop(cancel.clone()));
        state.cancel = Some(cancel);
        state.handle = Some(handle);
        Ok(())
    }

    /// Stop the background loop. Safe to call more than once.
    pub async fn shutdown(&self) {
        let (cancel, handle) = {
            let mut state = self.state.lock().await;
            (state.cancel.take(), state.handle.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Scheduler loop ended abnormally: {e}");
            }
            info!("Scheduler shut down");
        }
    }

    /// Replace the in-memory schedule with the store's contents.
    async fn load(&self, now: DateTime<Local>) -> Result<usize> {
        let records = self.store.list_jobs()?;
        let mut jobs = self.jobs.write().await;
        jobs.clear();
        for record in records {
            jobs.insert(record.id.clone(), ScheduledJob::new(record, &now));
        }
        Ok(jobs.len())
    }

    /// Dispatch every job due at `now` and advance its next fire time.
    ///
    /// Returns how many callbacks were spawned.
    pub async fn tick(&self, now: DateTime<Local>) -> usize {
        let grace = chrono::Duration::from_std(self.options.misfire_grace)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut due = Vec::new();
        {
            let mut jobs = self.jobs.write().await;
            for job in jobs.values_mut() {
                let Some(scheduled) = job.next_run else {
                    continue;
                };
                if scheduled > now {
                    continue;
                }
                let late = now - scheduled;
                if late <= grace {
                    due.push(job.record.clone());
                } else {
                    warn!(
                        job_id = %job.record.id,
                        late_secs = late.num_seconds(),
                        "Job missed its fire time, skipping"
                    );
                }
                job.next_run = job.record.trigger.next_after(&now);
            }
        }

        let callbacks = self.callbacks.read().await;
        let mut dispatched = 0;
        for record in due {
            let Some(callback) = callbacks.get(&record.callback) else {
                warn!(job_id = %record.id, callback = %record.callback, "No callback for job");
                continue;
            };
            debug!(job_id = %record.id, "Dispatching job");
            tokio::spawn(callback(record));
            dispatched += 1;
        }
        dispatched
    }

    async fn idle_duration(&self, now: DateTime<Local>) -> Duration {
        let jobs = self.jobs.read().await;
        jobs.values()
            .filter_map(|j| j.next_run)
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
            .min()
            .map_or(MAX_IDLE, |d| d.min(MAX_IDLE))
    }

    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        info!("Scheduler started");
        loop {
            self.tick(self.clock.now()).await;
            let idle = self.idle_duration(self.clock.now()).await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wakeup.notified() => {}
                _ = tokio::time::sleep(idle) => {}
            }
        }
        debug!("Scheduler loop exited");
    }
}
