//! riobot-reminder: group and private reminders on top of `riobot-cron`.
//!
//! [`ReminderService`] owns the job metadata cache, group feature toggles
//! and permission policy, routes the reminder commands, and reconciles the
//! cache from persisted jobs at startup.

pub mod cache;
pub mod commands;
pub mod delivery;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod model;
pub mod parse;
pub mod policy;
pub mod service;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use cache::JobCache;
pub use commands::ReminderCommand;
pub use delivery::{SEND_REMINDER, Transport};
pub use error::{ErrorKind, ReminderError};
pub use id::{JobIdError, JobIdGenerator, ParsedJobId, parse_job_id};
pub use lifecycle::RecoveryReport;
pub use model::{ReminderJob, ReminderPayload, Targets};
pub use parse::{ReminderRequest, parse_request};
pub use policy::PermissionPolicy;
pub use service::ReminderService;
pub use settings::GroupSettings;
