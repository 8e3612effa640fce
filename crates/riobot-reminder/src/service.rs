//! Reminder command handlers.

use std::sync::Arc;

use riobot_cron::{NewJob, Scheduler, SchedulerError};
use riobot_types::{InboundMessage, Message, Scope, Sender};
use tracing::{error, info, warn};

use crate::cache::JobCache;
use crate::commands::ReminderCommand;
use crate::delivery::{self, SEND_REMINDER, Transport};
use crate::error::{ErrorKind, ReminderError, Result};
use crate::id::JobIdGenerator;
use crate::model::ReminderJob;
use crate::parse::parse_request;
use crate::policy::PermissionPolicy;
use crate::settings::GroupSettings;

/// Owns the reminder state and handles the reminder commands.
pub struct ReminderService {
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) cache: Arc<JobCache>,
    pub(crate) settings: GroupSettings,
    policy: PermissionPolicy,
    ids: JobIdGenerator,
    command_start: Vec<String>,
}

impl ReminderService {
    /// Build the service and register the delivery callback with `scheduler`.
    pub async fn new(
        scheduler: Arc<Scheduler>,
        settings: GroupSettings,
        policy: PermissionPolicy,
        command_start: Vec<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let cache = Arc::new(JobCache::new());
        scheduler
            .register_callback(
                SEND_REMINDER,
                delivery::reminder_callback(Arc::clone(&cache), transport),
            )
            .await;
        Self {
            scheduler,
            cache,
            settings,
            policy,
            ids: JobIdGenerator::new(),
            command_start,
        }
    }

    pub fn cache(&self) -> &Arc<JobCache> {
        &self.cache
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Handle an inbound message. Returns the reply if it was a reminder
    /// command, `None` otherwise.
    pub async fn handle(&self, inbound: &InboundMessage) -> Option<Message> {
        let (command, args) = ReminderCommand::parse(&inbound.message, &self.command_start)?;
        let scope = &inbound.scope;
        let sender = &inbound.sender;

        let result = match command {
            ReminderCommand::Manage => {
                self.toggle_feature(scope, sender, &args.extract_plain_text())
                    .await
            }
            ReminderCommand::Set => self.create_reminder(scope, sender, &args).await,
            ReminderCommand::List => self.list_reminders(scope).await,
            ReminderCommand::Remove => {
                self.remove_reminder(scope, sender, &args.extract_plain_text())
                    .await
            }
        };

        Some(result.unwrap_or_else(|e| {
            if e.kind() == ErrorKind::Internal {
                error!(?command, scope = %scope, "Reminder command failed: {e}");
            }
            Message::text(e.user_message())
        }))
    }

    /// `群提醒 [开启|关闭]`
    pub async fn toggle_feature(&self, scope: &Scope, sender: &Sender, arg: &str) -> Result<Message> {
        let Some(group_id) = scope.group_id() else {
            return Err(ReminderError::GroupOnly);
        };
        let enabled = self.settings.ensure(group_id).await;

        if !self.policy.can_manage_group(sender) {
            return Err(ReminderError::AdminRequired);
        }

        match arg.trim().to_lowercase().as_str() {
            "开启" | "on" | "enable" => {
                self.settings.set(group_id, true).await?;
                info!(group_id, user_id = sender.user_id, "Reminders enabled");
                Ok(Message::text("✅ 已开启本群提醒功能"))
            }
            "关闭" | "off" | "disable" => {
                self.settings.set(group_id, false).await?;
                info!(group_id, user_id = sender.user_id, "Reminders disabled");
                Ok(Message::text("🛑 已关闭本群提醒功能"))
            }
            _ => {
                let status = if enabled { "开启" } else { "关闭" };
                Ok(Message::text(format!(
                    "当前群提醒状态:{status}\n使用格式:群提醒 [开启/关闭]"
                )))
            }
        }
    }

    /// `设置提醒 <time> [@targets] <content>`
    pub async fn create_reminder(
        &self,
        scope: &Scope,
        sender: &Sender,
        args: &Message,
    ) -> Result<Message> {
        let request = parse_request(args)?;

        if let Some(group_id) = scope.group_id() {
            if !self.settings.is_enabled(group_id).await {
                return Err(ReminderError::FeatureDisabled);
            }
        }

        let job = ReminderJob {
            id: self.ids.generate(scope, request.trigger, &request.content),
            scope: *scope,
            trigger: request.trigger,
            targets: request.targets,
            content: request.content,
            creator: sender.user_id,
            display_time: request.trigger.to_string(),
        };

        let payload = serde_json::to_value(job.payload())?;
        self.scheduler
            .add_job(NewJob {
                id: job.id.clone(),
                callback: SEND_REMINDER.to_string(),
                trigger: job.trigger,
                payload,
            })
            .await?;
        self.cache.insert(job.clone()).await;

        info!(
            job_id = %job.id,
            scope = %job.scope,
            creator = job.creator,
            time = %job.display_time,
            "Reminder created"
        );
        Ok(confirmation(&job))
    }

    /// `查看提醒`
    pub async fn list_reminders(&self, scope: &Scope) -> Result<Message> {
        let jobs = self.cache.list_scope(scope).await;
        if jobs.is_empty() {
            let empty = match scope {
                Scope::Group { .. } => "⭕ 当前群组没有定时提醒任务",
                Scope::Private { .. } => "⭕ 当前没有定时提醒任务",
            };
            return Ok(Message::text(empty));
        }

        let blocks: Vec<String> = jobs
            .iter()
            .enumerate()
            .map(|(idx, job)| format!("{}. {}\n创建者: {}", idx + 1, job.id, job.creator))
            .collect();
        Ok(Message::text(format!(
            "📜 当前生效的定时提醒:\n{}",
            blocks.join("\n\n")
        )))
    }

    /// `移除提醒 <id>`
    pub async fn remove_reminder(&self, scope: &Scope, sender: &Sender, arg: &str) -> Result<Message> {
        let id = arg.trim();
        if id.is_empty() {
            return Err(ReminderError::MissingJobId);
        }

        let job = self.cache.get(id).await.ok_or(ReminderError::NotFound)?;
        if job.scope != *scope && !self.policy.is_superuser(sender.user_id) {
            return Err(ReminderError::NotFound);
        }
        if !self.policy.can_remove(&job.scope, sender, job.creator) {
            return Err(ReminderError::CreatorOrAdminRequired);
        }

        match self.scheduler.remove_job(id).await {
            Ok(()) => {}
            Err(SchedulerError::NotFound(_)) => {
                self.cache.remove(id).await;
                warn!(job_id = %id, "Cached reminder had no scheduled job, purged");
                return Err(ReminderError::NotFound);
            }
            Err(e) => return Err(e.into()),
        }
        self.cache.remove(id).await;

        info!(job_id = %id, user_id = sender.user_id, "Reminder removed");
        Ok(Message::text(format!(
            "✅ 已成功移除任务:\n{} {}",
            job.display_time, job.id
        )))
    }
}

fn confirmation(job: &ReminderJob) -> Message {
    let mut msg = Message::new();
    msg.push_text(format!("⏰ 时间:{}\n", job.display_time));
    msg.push_text(format!("📝 内容:{}\n", job.content));
    job.targets.append_to(&mut msg);
    msg.push_text(format!("🔖 ID:{}", job.id));
    msg
}
