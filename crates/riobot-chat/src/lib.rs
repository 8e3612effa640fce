//! riobot-chat: conversational proxy with bounded per-conversation history.
//!
//! The language-model client itself sits behind [`ChatBackend`].

pub mod context;
pub mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use context::ChatContextManager;
pub use service::ChatService;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Nothing to send")]
    EmptyInput,
    #[error("Chat backend error: {0:#}")]
    Backend(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn in a conversation, in the shape chat-completion APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// A language-model completion endpoint. One call per conversation turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}
