//! Chat session entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", indexed)]
    pub user_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Ordered `ChatMessage` list as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub messages: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A user message followed by the bot reply, both stamped `at`
    pub fn exchange(user_text: &str, bot_text: &str, at: DateTime<Utc>) -> [ChatMessage; 2] {
        [
            ChatMessage { role: ChatRole::User, text: user_text.to_string(), timestamp: at },
            ChatMessage { role: ChatRole::Bot, text: bot_text.to_string(), timestamp: at },
        ]
    }
}

const TITLE_MAX_CHARS: usize = 50;

/// Session title derived from the first user message
pub fn session_title(user_text: &str) -> String {
    if user_text.chars().count() > TITLE_MAX_CHARS {
        let head: String = user_text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        user_text.to_string()
    }
}
