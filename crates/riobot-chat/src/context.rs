//! Per-conversation chat history.

use std::collections::{HashMap, VecDeque};

use riobot_types::Scope;
use tokio::sync::RwLock;

use crate::ChatMessage;

/// Keeps the most recent `max_history` messages of each conversation.
pub struct ChatContextManager {
    contexts: RwLock<HashMap<String, VecDeque<ChatMessage>>>,
    max_history: usize,
}

impl ChatContextManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// `group_<id>` for groups, `private_<id>` for one-to-one chats.
    pub fn session_id(scope: &Scope) -> String {
        match scope {
            Scope::Group { group_id } => format!("group_{group_id}"),
            Scope::Private { user_id } => format!("private_{user_id}"),
        }
    }

    pub async fn get_history(&self, scope: &Scope) -> Vec<ChatMessage> {
        self.contexts
            .read()
            .await
            .get(&Self::session_id(scope))
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn add_message(&self, scope: &Scope, message: ChatMessage) {
        let mut contexts = self.contexts.write().await;
        let history = contexts.entry(Self::session_id(scope)).or_default();
        history.push_back(message);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    pub async fn clear_history(&self, scope: &Scope) {
        self.contexts.write().await.remove(&Self::session_id(scope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids() {
        assert_eq!(ChatContextManager::session_id(&Scope::group(5)), "group_5");
        assert_eq!(ChatContextManager::session_id(&Scope::private(5)), "private_5");
    }

    #[tokio::test]
    async fn test_keeps_last_messages() {
        let ctx = ChatContextManager::new(3);
        let scope = Scope::group(1);
        for i in 0..5 {
            ctx.add_message(&scope, ChatMessage::user(format!("m{i}"))).await;
        }
        let contents: Vec<String> = ctx
            .get_history(&scope)
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_clearable() {
        let ctx = ChatContextManager::new(10);
        ctx.add_message(&Scope::group(1), ChatMessage::user("a")).await;
        ctx.add_message(&Scope::private(1), ChatMessage::user("b")).await;

        ctx.clear_history(&Scope::group(1)).await;
        assert!(ctx.get_history(&Scope::group(1)).await.is_empty());
        assert_eq!(ctx.get_history(&Scope::private(1)).await.len(), 1);
    }
}
