//! Reminder command errors. `Display` is the text shown to the user.

use riobot_cron::SchedulerError;
use riobot_storage::StorageError;

/// Shown in place of any internal failure.
pub const INTERNAL_ERROR_REPLY: &str = "❌ 操作失败,请稍后重试";

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    // ──── Validation ────
    #[error("❌ 时间格式错误!正确格式:时:分")]
    InvalidTimeFormat,
    #[error("❌ 时间范围错误(00:00-23:59)")]
    TimeOutOfRange,
    #[error("❌ 提醒内容不能为空")]
    EmptyContent,
    #[error("❌ 本群提醒功能未启用")]
    FeatureDisabled,
    #[error("❌ 请输入要移除的任务ID\n(可通过「查看提醒」获取ID)")]
    MissingJobId,
    #[error("❌ 该命令仅支持群聊使用")]
    GroupOnly,

    // ──── Permission ────
    #[error("❌ 需要管理员权限")]
    AdminRequired,
    #[error("❌ 需要管理员权限或创建者身份")]
    CreatorOrAdminRequired,

    // ──── Lookup ────
    #[error("❌ 未找到对应任务")]
    NotFound,

    // ──── Internal ────
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Coarse classification of a [`ReminderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Internal,
}

impl ReminderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReminderError::InvalidTimeFormat
            | ReminderError::TimeOutOfRange
            | ReminderError::EmptyContent
            | ReminderError::FeatureDisabled
            | ReminderError::MissingJobId
            | ReminderError::GroupOnly => ErrorKind::Validation,
            ReminderError::AdminRequired | ReminderError::CreatorOrAdminRequired => {
                ErrorKind::Permission
            }
            ReminderError::NotFound => ErrorKind::NotFound,
            ReminderError::Scheduler(_) | ReminderError::Storage(_) | ReminderError::Payload(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// The reply text for this error. Internal details are never exposed.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => INTERNAL_ERROR_REPLY.to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ReminderError::TimeOutOfRange.kind(), ErrorKind::Validation);
        assert_eq!(ReminderError::FeatureDisabled.kind(), ErrorKind::Validation);
        assert_eq!(
            ReminderError::CreatorOrAdminRequired.kind(),
            ErrorKind::Permission
        );
        assert_eq!(ReminderError::NotFound.kind(), ErrorKind::NotFound);
        let internal = ReminderError::from(SchedulerError::AlreadyRunning);
        assert_eq!(internal.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        assert_eq!(
            ReminderError::CreatorOrAdminRequired.user_message(),
            "❌ 需要管理员权限或创建者身份"
        );
        let internal = ReminderError::from(SchedulerError::NotFound("rem_x".into()));
        assert_eq!(internal.user_message(), INTERNAL_ERROR_REPLY);
        assert!(internal.to_string().contains("rem_x"));
    }
}
