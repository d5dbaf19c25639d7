//! SeaORM entity models

mod chat_session;
mod paper;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use chat_session::{
    Entity as ChatSessionEntity,
    Model as ChatSession,
    ActiveModel as ChatSessionActiveModel,
    Column as ChatSessionColumn,
    ChatMessage,
    ChatRole,
    session_title,
};
