//! Reminder data model.

use riobot_cron::DailyTrigger;
use riobot_types::{GroupId, MentionTarget, Message, Scope, UserId};
use serde::{Deserialize, Serialize};

const ALL_SENTINEL: &str = "all";

/// Who a reminder highlights when it fires.
///
/// Stored as a list of strings where `"all"` stands for every member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Targets {
    #[default]
    None,
    All,
    Users(Vec<UserId>),
}

impl Targets {
    pub fn is_empty(&self) -> bool {
        matches!(self, Targets::None)
    }

    /// Mention segments in send order. `All` supersedes individual users.
    pub fn mentions(&self) -> Vec<MentionTarget> {
        match self {
            Targets::None => Vec::new(),
            Targets::All => vec![MentionTarget::All],
            Targets::Users(users) => users.iter().copied().map(MentionTarget::User).collect(),
        }
    }

    /// Append `👥 对象:` and the mentions, if there are any.
    pub(crate) fn append_to(&self, message: &mut Message) {
        if self.is_empty() {
            return;
        }
        message.push_text("👥 对象:");
        for target in self.mentions() {
            message.push_mention(target);
        }
        message.push_text("\n");
    }
}

impl From<Vec<String>> for Targets {
    fn from(raw: Vec<String>) -> Self {
        if raw.iter().any(|t| t == ALL_SENTINEL) {
            return Targets::All;
        }
        let users: Vec<UserId> = raw.iter().filter_map(|t| t.trim().parse().ok()).collect();
        if users.is_empty() {
            Targets::None
        } else {
            Targets::Users(users)
        }
    }
}

impl From<Targets> for Vec<String> {
    fn from(targets: Targets) -> Self {
        match targets {
            Targets::None => Vec::new(),
            Targets::All => vec![ALL_SENTINEL.to_string()],
            Targets::Users(users) => users.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// A reminder as held in the job metadata cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderJob {
    pub id: String,
    pub scope: Scope,
    pub trigger: DailyTrigger,
    pub targets: Targets,
    pub content: String,
    pub creator: UserId,
    /// `HH:MM` as shown to users.
    pub display_time: String,
}

impl ReminderJob {
    pub fn payload(&self) -> ReminderPayload {
        ReminderPayload {
            targets: self.targets.clone(),
            content: self.content.clone(),
            creator: self.creator,
            group_id: self.scope.group_id(),
            user_id: match self.scope {
                Scope::Private { user_id } => Some(user_id),
                Scope::Group { .. } => None,
            },
            time: self.display_time.clone(),
        }
    }
}

/// The payload persisted with each reminder job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    #[serde(default)]
    pub targets: Targets,
    pub content: String,
    pub creator: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_targets_from_strings() {
        assert_eq!(Targets::from(vec![]), Targets::None);
        assert_eq!(
            Targets::from(vec!["1".into(), "2".into()]),
            Targets::Users(vec![1, 2])
        );
        assert_eq!(Targets::from(vec!["1".into(), "all".into()]), Targets::All);
        assert_eq!(Targets::from(vec!["bogus".into()]), Targets::None);
    }

    #[test]
    fn test_targets_serde() {
        let json = serde_json::to_value(Targets::Users(vec![7, 8])).unwrap();
        assert_eq!(json, json!(["7", "8"]));
        let all: Targets = serde_json::from_value(json!(["all"])).unwrap();
        assert_eq!(all.mentions(), vec![MentionTarget::All]);
    }

    #[test]
    fn test_payload_requires_content_and_creator() {
        let payload: ReminderPayload = serde_json::from_value(json!({
            "content": "早会提醒",
            "creator": 456,
            "group_id": 123,
            "time": "09:30",
        }))
        .unwrap();
        assert_eq!(payload.targets, Targets::None);
        assert_eq!(payload.group_id, Some(123));

        assert!(serde_json::from_value::<ReminderPayload>(json!({"creator": 1})).is_err());
        assert!(serde_json::from_value::<ReminderPayload>(json!({"content": "x"})).is_err());
    }

    #[test]
    fn test_job_payload_carries_scope() {
        let job = ReminderJob {
            id: "rem_p9_0800_00000000_1".into(),
            scope: Scope::private(9),
            trigger: DailyTrigger::new(8, 0).unwrap(),
            targets: Targets::None,
            content: "吃药".into(),
            creator: 9,
            display_time: "08:00".into(),
        };
        let payload = job.payload();
        assert_eq!(payload.user_id, Some(9));
        assert_eq!(payload.group_id, None);
        assert_eq!(payload.time, "08:00");
    }
}
