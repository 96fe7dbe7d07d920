use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::chat_users;

/// What a user is allowed to be in chat. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Member,
    Bot,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Bot => "bot",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role, treating anything unknown as a plain member.
    pub fn from_db(value: &str) -> Self {
        match value {
            "bot" => Self::Bot,
            "admin" | "moderator" | "staff" => Self::Admin,
            _ => Self::Member,
        }
    }
}

/// A chat user as resolved by the identity source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_color: String,
    pub role: UserRole,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl ChatUser {
    /// Convenience constructor for seeding and tests; starts offline.
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
        avatar_color: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: display_name.into(),
            avatar_color: avatar_color.into(),
            role,
            is_online: false,
            last_seen_at: None,
        }
    }
}

/// Display attributes of a message author at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub display_name: String,
    pub avatar_color: String,
    pub role: UserRole,
}

impl From<&ChatUser> for Author {
    fn from(user: &ChatUser) -> Self {
        Self {
            display_name: user.display_name.clone(),
            avatar_color: user.avatar_color.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = chat_users)]
pub struct ChatUserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_color: String,
    pub role: String,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<ChatUserRow> for ChatUser {
    fn from(row: ChatUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            avatar_color: row.avatar_color,
            role: UserRole::from_db(&row.role),
            is_online: row.is_online,
            last_seen_at: row.last_seen_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_users)]
pub struct NewChatUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub display_name: &'a str,
    pub avatar_color: &'a str,
    pub role: &'a str,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}
