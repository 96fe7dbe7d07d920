use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::schema::chat_messages;

use super::user::Author;

/// A persisted chat message. Never edited or deleted by the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
pub struct ChatMessage {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    pub reply_to_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage<'a> {
    pub id: &'a str,
    pub channel_id: &'a str,
    pub user_id: &'a str,
    pub content: &'a str,
    pub reply_to_id: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// A message joined with its author's current profile, if the author still exists.
#[derive(Debug, Clone)]
pub struct MessageWithAuthor {
    pub message: ChatMessage,
    pub author: Option<Author>,
}
