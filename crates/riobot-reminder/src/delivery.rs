//! Reminder delivery: the scheduler callback and the outbound transport seam.

use std::sync::Arc;

use async_trait::async_trait;
use riobot_cron::{JobCallback, JobRecord};
use riobot_types::{GroupId, Message, Scope, UserId};
use tracing::{debug, info, warn};

use crate::cache::JobCache;
use crate::model::ReminderJob;

/// Callback name reminder jobs are registered under.
pub const SEND_REMINDER: &str = "send_reminder";

/// Outbound message transport to the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_group_message(&self, group_id: GroupId, message: Message) -> anyhow::Result<()>;

    async fn send_private_message(&self, user_id: UserId, message: Message)
    -> anyhow::Result<()>;
}

/// The notification sent when `job` fires.
pub fn build_notification(job: &ReminderJob) -> Message {
    let mut msg = Message::new();
    match job.scope {
        Scope::Group { .. } => {
            msg.push_text("🔔 定时提醒\n");
            msg.push_text(format!("⏰ 时间:{}\n", job.display_time));
            msg.push_text(format!("📝 内容:{}\n", job.content));
            job.targets.append_to(&mut msg);
        }
        Scope::Private { .. } => {
            msg.push_text("🔔 私人提醒\n");
            msg.push_text(format!("⏰ 时间:{}\n", job.display_time));
            msg.push_text(format!("📝 内容:{}", job.content));
        }
    }
    msg
}

/// Deliver the reminder cached under `job_id`.
///
/// A job missing from the cache has been removed and is ignored. Transport
/// failures are logged and never propagated.
pub async fn send_reminder(cache: &JobCache, transport: &dyn Transport, job_id: &str) {
    let Some(job) = cache.get(job_id).await else {
        debug!(job_id = %job_id, "Fired job has no cached reminder, ignoring");
        return;
    };

    let message = build_notification(&job);
    let result = match job.scope {
        Scope::Group { group_id } => transport.send_group_message(group_id, message).await,
        Scope::Private { user_id } => transport.send_private_message(user_id, message).await,
    };

    match result {
        Ok(()) => info!(job_id = %job.id, scope = %job.scope, "Reminder delivered"),
        Err(e) => warn!(job_id = %job.id, scope = %job.scope, "Reminder delivery failed: {e:#}"),
    }
}

/// Build the scheduler callback for [`SEND_REMINDER`].
pub fn reminder_callback(cache: Arc<JobCache>, transport: Arc<dyn Transport>) -> JobCallback {
    Arc::new(move |record: JobRecord| {
        let cache = Arc::clone(&cache);
        let transport = Arc::clone(&transport);
        Box::pin(async move {
            send_reminder(&cache, transport.as_ref(), &record.id).await;
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Targets;
    use crate::test_support::RecordingTransport;
    use riobot_cron::DailyTrigger;
    use riobot_types::MentionTarget;

    fn job(id: &str, scope: Scope, targets: Targets) -> ReminderJob {
        ReminderJob {
            id: id.into(),
            scope,
            trigger: DailyTrigger::new(9, 30).unwrap(),
            targets,
            content: "早会提醒".into(),
            creator: 456,
            display_time: "09:30".into(),
        }
    }

    #[test]
    fn test_group_notification() {
        let msg = build_notification(&job("a", Scope::group(123), Targets::Users(vec![1, 2])));
        assert_eq!(
            msg.to_cq(),
            "🔔 定时提醒\n⏰ 时间:09:30\n📝 内容:早会提醒\n👥 对象:[CQ:at,qq=1][CQ:at,qq=2]\n"
        );
    }

    #[test]
    fn test_group_notification_all_and_none() {
        let all = build_notification(&job("a", Scope::group(123), Targets::All));
        assert_eq!(all.mentions().collect::<Vec<_>>(), vec![&MentionTarget::All]);
        let none = build_notification(&job("a", Scope::group(123), Targets::None));
        assert!(!none.to_cq().contains("👥"));
    }

    #[test]
    fn test_private_notification() {
        let msg = build_notification(&job("a", Scope::private(456), Targets::None));
        assert_eq!(msg.to_cq(), "🔔 私人提醒\n⏰ 时间:09:30\n📝 内容:早会提醒");
    }

    #[tokio::test]
    async fn test_send_routes_by_scope() {
        let cache = JobCache::new();
        cache.insert(job("g", Scope::group(123), Targets::None)).await;
        cache.insert(job("p", Scope::private(456), Targets::None)).await;
        let transport = RecordingTransport::new();

        send_reminder(&cache, &transport, "g").await;
        send_reminder(&cache, &transport, "p").await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, Scope::group(123));
        assert_eq!(sent[1].0, Scope::private(456));
    }

    #[tokio::test]
    async fn test_send_missing_job_is_noop() {
        let cache = JobCache::new();
        let transport = RecordingTransport::new();
        send_reminder(&cache, &transport, "gone").await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let cache = JobCache::new();
        cache.insert(job("g", Scope::group(123), Targets::None)).await;
        let transport = RecordingTransport::failing();
        send_reminder(&cache, &transport, "g").await;
        send_reminder(&cache, &transport, "g").await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_callback_delivers_by_record_id() {
        let cache = Arc::new(JobCache::new());
        cache.insert(job("g", Scope::group(123), Targets::None)).await;
        let transport = Arc::new(RecordingTransport::new());
        let callback = reminder_callback(Arc::clone(&cache), transport.clone());

        let record = JobRecord {
            id: "g".into(),
            callback: SEND_REMINDER.into(),
            trigger: DailyTrigger::new(9, 30).unwrap(),
            payload: serde_json::Value::Null,
            created_at: chrono::Utc::now(),
        };
        callback(record).await;
        assert_eq!(transport.sent().len(), 1);
    }
}
