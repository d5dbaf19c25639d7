//! Chat history sink
//!
//! Searches and answers are recorded as user/bot message pairs on the
//! caller's most recent chat session.

use crate::db::models::{session_title, ChatMessage};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Title for a session an exchange has to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTitle {
    /// The user's message, truncated
    FromMessage,
    /// Fixed placeholder used for sessions opened by a question
    NewChat,
}

impl SessionTitle {
    pub fn resolve(self, user_text: &str) -> String {
        match self {
            SessionTitle::FromMessage => session_title(user_text),
            SessionTitle::NewChat => "New Chat".to_string(),
        }
    }
}

#[async_trait]
pub trait ChatHistorySink: Send + Sync {
    /// Append a user message and the bot reply to the user's latest session.
    ///
    /// `title` only applies when the user has no session yet.
    async fn append_exchange(
        &self,
        user_id: &str,
        user_text: &str,
        bot_text: &str,
        title: SessionTitle,
    ) -> Result<()>;
}

/// One stored conversation
#[derive(Debug, Clone)]
pub struct ChatTranscript {
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// Process-local history, one session per user
#[derive(Default)]
pub struct InMemoryChatHistory {
    sessions: RwLock<HashMap<String, ChatTranscript>>,
}

impl InMemoryChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transcript(&self, user_id: &str) -> Option<ChatTranscript> {
        self.sessions.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl ChatHistorySink for InMemoryChatHistory {
    async fn append_exchange(
        &self,
        user_id: &str,
        user_text: &str,
        bot_text: &str,
        title: SessionTitle,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let transcript = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| ChatTranscript {
                title: title.resolve(user_text),
                messages: Vec::new(),
            });
        transcript
            .messages
            .extend(ChatMessage::exchange(user_text, bot_text, Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ChatRole;

    #[tokio::test]
    async fn test_exchanges_accumulate_in_one_session() {
        let history = InMemoryChatHistory::new();
        history
            .append_exchange("u1", "Find papers on rust", "Found 2 papers", SessionTitle::FromMessage)
            .await
            .unwrap();
        history
            .append_exchange("u1", "What is it?", "A language", SessionTitle::NewChat)
            .await
            .unwrap();

        let transcript = history.transcript("u1").await.unwrap();
        assert_eq!(transcript.title, "Find papers on rust");
        assert_eq!(transcript.messages.len(), 4);
        assert_eq!(transcript.messages[0].role, ChatRole::User);
        assert_eq!(transcript.messages[3].text, "A language");
        assert!(history.transcript("u2").await.is_none());
    }

    #[test]
    fn test_long_first_message_truncates_title() {
        let history = InMemoryChatHistory::new();
        let long_topic = format!("Find papers on {}", "quantum error correction ".repeat(4));

        let transcript = tokio_test::block_on(async {
            history
                .append_exchange("u1", &long_topic, "Found 0 papers", SessionTitle::FromMessage)
                .await
                .unwrap();
            history.transcript("u1").await.unwrap()
        });

        assert!(transcript.title.ends_with("..."));
        assert_eq!(transcript.messages[0].text, long_topic);
    }

    #[tokio::test]
    async fn test_question_opens_new_chat() {
        let history = InMemoryChatHistory::new();
        history
            .append_exchange("u1", "What rank does LoRA use?", "Rank 8", SessionTitle::NewChat)
            .await
            .unwrap();

        let transcript = history.transcript("u1").await.unwrap();
        assert_eq!(transcript.title, "New Chat");
        assert_eq!(transcript.messages.len(), 2);
    }
}
