//! Reminder job identifiers.
//!
//! Format: `rem_<scope>_<HHMM>_<hash8>_<nanos>`, where `<scope>` is the group
//! id for group reminders and `p<user id>` for private ones, `<hash8>` is the
//! first 8 hex digits of the content's SHA-256, and `<nanos>` is a Unix
//! timestamp in nanoseconds.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use riobot_cron::DailyTrigger;
use riobot_types::{GroupId, Scope, UserId};
use sha2::{Digest, Sha256};

pub const JOB_ID_PREFIX: &str = "rem";
const HASH_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobIdError {
    #[error("not a reminder job id")]
    Prefix,
    #[error("missing id component: {0}")]
    Missing(&'static str),
    #[error("invalid scope component: {0}")]
    Scope(String),
    #[error("invalid time component: {0}")]
    Time(String),
    #[error("invalid hash component: {0}")]
    Hash(String),
    #[error("invalid timestamp component: {0}")]
    Timestamp(String),
}

/// Fields recovered from a job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedJobId {
    pub scope: Scope,
    pub trigger: DailyTrigger,
    pub content_hash: String,
    pub timestamp_ns: i64,
}

/// Mints job ids. Timestamps are strictly increasing per generator, so ids
/// never collide even when the clock does not advance between calls.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: AtomicI64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, scope: &Scope, trigger: DailyTrigger, content: &str) -> String {
        format!(
            "{JOB_ID_PREFIX}_{}_{:02}{:02}_{}_{}",
            scope_token(scope),
            trigger.hour(),
            trigger.minute(),
            content_hash(content),
            self.next_timestamp()
        )
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let advance = |last: i64| now.max(last.saturating_add(1));
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
            .unwrap_or_else(|last| last);
        advance(previous)
    }
}

fn scope_token(scope: &Scope) -> String {
    match scope {
        Scope::Group { group_id } => group_id.to_string(),
        Scope::Private { user_id } => format!("p{user_id}"),
    }
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..HASH_LEN / 2])
}

/// Parse a reminder job id back into its components.
pub fn parse_job_id(id: &str) -> Result<ParsedJobId, JobIdError> {
    let mut parts = id.splitn(5, '_');
    if parts.next() != Some(JOB_ID_PREFIX) {
        return Err(JobIdError::Prefix);
    }
    let scope = parts.next().ok_or(JobIdError::Missing("scope"))?;
    let time = parts.next().ok_or(JobIdError::Missing("time"))?;
    let hash = parts.next().ok_or(JobIdError::Missing("hash"))?;
    let timestamp = parts.next().ok_or(JobIdError::Missing("timestamp"))?;

    let scope = parse_scope(scope)?;
    let trigger = parse_time(time)?;

    if hash.len() != HASH_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(JobIdError::Hash(hash.to_string()));
    }
    let timestamp_ns = timestamp
        .parse::<i64>()
        .map_err(|_| JobIdError::Timestamp(timestamp.to_string()))?;

    Ok(ParsedJobId {
        scope,
        trigger,
        content_hash: hash.to_string(),
        timestamp_ns,
    })
}

fn parse_scope(token: &str) -> Result<Scope, JobIdError> {
    let invalid = || JobIdError::Scope(token.to_string());
    match token.strip_prefix('p') {
        Some(user) => user.parse::<UserId>().map(Scope::private).map_err(|_| invalid()),
        None => token.parse::<GroupId>().map(Scope::group).map_err(|_| invalid()),
    }
}

fn parse_time(token: &str) -> Result<DailyTrigger, JobIdError> {
    let invalid = || JobIdError::Time(token.to_string());
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour = token[..2].parse().map_err(|_| invalid())?;
    let minute = token[2..].parse().map_err(|_| invalid())?;
    DailyTrigger::new(hour, minute).map_err(|_| invalid())
}
