//! riobot-types: chat-domain value types shared by every riobot crate.

pub mod command;
pub mod message;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use command::strip_command;
pub use message::{MentionTarget, Message, Segment};

/// Platform user identifier.
pub type UserId = i64;
/// Platform group identifier.
pub type GroupId = i64;

// ──────────────────── Conversation Types ────────────────────

/// Where a conversation takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    /// A group chat.
    Group { group_id: GroupId },
    /// A one-to-one conversation with a user.
    Private { user_id: UserId },
}

impl Scope {
    pub fn group(group_id: GroupId) -> Self {
        Scope::Group { group_id }
    }

    pub fn private(user_id: UserId) -> Self {
        Scope::Private { user_id }
    }

    /// The group id, if this is a group scope.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Scope::Group { group_id } => Some(*group_id),
            Scope::Private { .. } => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Scope::Group { .. })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Group { group_id } => write!(f, "group:{group_id}"),
            Scope::Private { user_id } => write!(f, "private:{user_id}"),
        }
    }
}

// ──────────────────── Sender Types ────────────────────

/// A sender's role within a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
    Owner,
}

impl Role {
    /// Admins and owners both count as group administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: UserId,
    /// Group role; `None` outside groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Sender {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            role: None,
            nickname: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn is_group_admin(&self) -> bool {
        self.role.is_some_and(|r| r.is_admin())
    }
}

// ──────────────────── Channel Types ────────────────────

/// Message from the chat platform to the bot.
///
/// Adapters pass raw platform messages through [`InboundMessage::strip_self_mention`]
/// before routing, so `@bot 设置提醒 ...` matches like `设置提醒 ...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub scope: Scope,
    pub sender: Sender,
    pub message: Message,
    /// Whether the bot was addressed (mentioned in a group, or any private message).
    #[serde(default)]
    pub to_me: bool,
    /// Message timestamp (unix millis).
    pub timestamp: i64,
}

impl InboundMessage {
    /// Drop a leading mention of the bot (`self_id`) and mark the message as
    /// addressed to it.
    pub fn strip_self_mention(mut self, self_id: UserId) -> Self {
        if self.message.strip_leading_mention(self_id) {
            self.to_me = true;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_serde() {
        let scope = Scope::group(123);
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#"{"type":"group","group_id":123}"#);
        let parsed: Scope = serde_json::from_str(r#"{"type":"private","user_id":9}"#).unwrap();
        assert_eq!(parsed, Scope::private(9));
        assert_eq!(parsed.group_id(), None);
    }

    #[test]
    fn test_role_admin() {
        assert!(Role::Owner.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Member.is_admin());
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_sender_without_role_is_not_admin() {
        assert!(!Sender::new(1).is_group_admin());
        assert!(Sender::new(1).with_role(Role::Owner).is_group_admin());
    }

    #[test]
    fn test_inbound_message_serde() {
        let json = r#"{
            "scope": {"type": "group", "group_id": 123},
            "sender": {"user_id": 456, "role": "admin"},
            "message": [{"type": "text", "data": {"text": "查看提醒"}}],
            "timestamp": 1700000000000
        }"#;
        let parsed: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.scope, Scope::group(123));
        assert_eq!(parsed.sender.role, Some(Role::Admin));
        assert!(!parsed.to_me);
        assert_eq!(parsed.message.extract_plain_text(), "查看提醒");
    }

    #[test]
    fn test_strip_self_mention_marks_to_me() {
        let inbound = InboundMessage {
            scope: Scope::group(123),
            sender: Sender::new(456),
            message: Message::from_cq("[CQ:at,qq=8000] 查看提醒"),
            to_me: false,
            timestamp: 0,
        };
        let routed = inbound.clone().strip_self_mention(8000);
        assert!(routed.to_me);
        assert_eq!(routed.message.to_cq(), "查看提醒");

        let untouched = inbound.strip_self_mention(9000);
        assert!(!untouched.to_me);
        assert_eq!(untouched.message.mentions().count(), 1);
    }
}
