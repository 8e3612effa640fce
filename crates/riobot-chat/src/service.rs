//! Chat turns addressed to the bot.

use std::sync::Arc;

use riobot_types::{InboundMessage, Message, Scope, strip_command};
use tracing::{debug, warn};

use crate::context::ChatContextManager;
use crate::{ChatBackend, ChatError, ChatMessage};

const CLEAR_COMMAND: &[&str] = &["clear", "清除历史"];
const CLEARED_REPLY: &str = "对话历史已清除！";

/// Forwards conversation turns to a [`ChatBackend`].
pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    context: ChatContextManager,
    system_prompt: String,
    command_start: Vec<String>,
}

impl ChatService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        max_history: usize,
        system_prompt: impl Into<String>,
        command_start: Vec<String>,
    ) -> Self {
        Self {
            backend,
            context: ChatContextManager::new(max_history),
            system_prompt: system_prompt.into(),
            command_start,
        }
    }

    pub fn context(&self) -> &ChatContextManager {
        &self.context
    }

    /// Run one conversation turn. History is only extended when the backend
    /// answers.
    pub async fn chat(&self, scope: &Scope, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let history = self.context.get_history(scope).await;
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(history);
        messages.push(ChatMessage::user(text));

        let reply = self
            .backend
            .complete(&messages)
            .await
            .map_err(ChatError::Backend)?;

        self.context.add_message(scope, ChatMessage::user(text)).await;
        self.context
            .add_message(scope, ChatMessage::assistant(reply.clone()))
            .await;
        debug!(scope = %scope, "Chat turn completed");
        Ok(reply)
    }

    /// Handle `clear`/`清除历史`, and chat on messages addressed to the bot.
    pub async fn handle(&self, inbound: &InboundMessage) -> Option<Message> {
        if strip_command(&inbound.message, &self.command_start, CLEAR_COMMAND).is_some() {
            self.context.clear_history(&inbound.scope).await;
            return Some(Message::text(CLEARED_REPLY));
        }
        if !inbound.to_me {
            return None;
        }

        match self
            .chat(&inbound.scope, &inbound.message.extract_plain_text())
            .await
        {
            Ok(reply) => Some(Message::text(reply)),
            Err(ChatError::EmptyInput) => None,
            Err(e) => {
                warn!(scope = %inbound.scope, "Chat failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use riobot_types::Sender;

    #[derive(Default)]
    struct CountingBackend {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            if self.fail {
                anyhow::bail!("rate limited");
            }
            Ok(format!("回复{}", self.calls.lock().unwrap().len()))
        }
    }

    fn service(backend: Arc<CountingBackend>) -> ChatService {
        ChatService::new(backend, 10, "你是一个乐于助人的助手", vec!["/".into(), String::new()])
    }

    fn inbound(raw: &str, to_me: bool) -> InboundMessage {
        InboundMessage {
            scope: Scope::group(1),
            sender: Sender::new(2),
            message: Message::from_cq(raw),
            to_me,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_one_backend_call_per_turn() {
        let backend = Arc::new(CountingBackend::default());
        let chat = service(backend.clone());
        let scope = Scope::group(1);

        assert_eq!(chat.chat(&scope, "你好").await.unwrap(), "回复1");
        assert_eq!(chat.chat(&scope, "再见").await.unwrap(), "回复2");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let second = &calls[1];
        assert_eq!(second[0], ChatMessage::system("你是一个乐于助人的助手"));
        assert_eq!(second[1], ChatMessage::user("你好"));
        assert_eq!(second[2], ChatMessage::assistant("回复1"));
        assert_eq!(second[3], ChatMessage::user("再见"));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let backend = Arc::new(CountingBackend {
            fail: true,
            ..Default::default()
        });
        let chat = service(backend.clone());
        let scope = Scope::group(1);

        assert!(matches!(chat.chat(&scope, "你好").await, Err(ChatError::Backend(_))));
        assert!(chat.context().get_history(&scope).await.is_empty());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_clear_and_to_me() {
        let backend = Arc::new(CountingBackend::default());
        let chat = service(backend.clone());

        assert!(chat.handle(&inbound("随便聊聊", false)).await.is_none());
        let reply = chat.handle(&inbound("你好", true)).await.unwrap();
        assert_eq!(reply.extract_plain_text(), "回复1");
        assert_eq!(chat.context().get_history(&Scope::group(1)).await.len(), 2);

        let cleared = chat.handle(&inbound("/清除历史", false)).await.unwrap();
        assert_eq!(cleared.extract_plain_text(), "对话历史已清除！");
        assert!(chat.context().get_history(&Scope::group(1)).await.is_empty());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }
}
