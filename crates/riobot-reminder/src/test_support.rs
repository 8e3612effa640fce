//! Shared fixtures for the reminder tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use riobot_cron::{JobStore, Scheduler, SchedulerOptions};
use riobot_types::{GroupId, InboundMessage, Message, Role, Scope, Sender, UserId};

use crate::delivery::Transport;
use crate::policy::PermissionPolicy;
use crate::service::ReminderService;
use crate::settings::GroupSettings;

pub const SUPERUSER: UserId = 10001;

/// Records every outbound message; optionally fails every send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Scope, Message)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(Scope, Message)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, scope: Scope, message: Message) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("transport offline");
        }
        self.sent.lock().unwrap().push((scope, message));
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_group_message(&self, group_id: GroupId, message: Message) -> anyhow::Result<()> {
        self.record(Scope::group(group_id), message)
    }

    async fn send_private_message(
        &self,
        user_id: UserId,
        message: Message,
    ) -> anyhow::Result<()> {
        self.record(Scope::private(user_id), message)
    }
}

/// A service over `store` with [`SUPERUSER`] configured.
pub async fn service_on(
    store: Arc<JobStore>,
    settings: GroupSettings,
) -> (ReminderService, Arc<RecordingTransport>) {
    let scheduler = Arc::new(Scheduler::new(store, SchedulerOptions::default()));
    let transport = Arc::new(RecordingTransport::new());
    let service = ReminderService::new(
        scheduler,
        settings,
        PermissionPolicy::new([SUPERUSER]),
        vec!["/".into(), String::new()],
        transport.clone(),
    )
    .await;
    (service, transport)
}

pub async fn in_memory_service() -> (ReminderService, Arc<RecordingTransport>) {
    let store = Arc::new(JobStore::open_in_memory().unwrap());
    service_on(store, GroupSettings::in_memory()).await
}

pub fn group_message(group_id: GroupId, user_id: UserId, role: Role, raw: &str) -> InboundMessage {
    InboundMessage {
        scope: Scope::group(group_id),
        sender: Sender::new(user_id).with_role(role),
        message: Message::from_cq(raw),
        to_me: false,
        timestamp: 0,
    }
}

pub fn private_message(user_id: UserId, raw: &str) -> InboundMessage {
    InboundMessage {
        scope: Scope::private(user_id),
        sender: Sender::new(user_id),
        message: Message::from_cq(raw),
        to_me: true,
        timestamp: 0,
    }
}

/// The id in a create-reminder reply.
pub fn reply_job_id(reply: &Message) -> String {
    let text = reply.extract_plain_text();
    text.rsplit("🔖 ID:")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
