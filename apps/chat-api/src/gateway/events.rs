//! Wire-format frames exchanged over the chat WebSocket.
//!
//! Every frame is a JSON object discriminated by its `type` field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::models::message::{ChatMessage, MessageWithAuthor};
use crate::models::user::UserRole;

use super::session::Session;

/// Shown for history entries whose author record no longer exists.
pub const UNKNOWN_AUTHOR_NAME: &str = "Unknown user";
pub const DEFAULT_AVATAR_COLOR: &str = "#6b7280";

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A frame received from the client.
///
/// Required fields are modelled as `Option` so that a missing field can be
/// reported as such instead of as a malformed frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join {
        user_id: Option<String>,
        channel_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SwitchChannel { channel_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    Message {
        content: Option<String>,
        reply_to_id: Option<String>,
    },
    Typing {},
}

impl ClientFrame {
    /// Parse a text frame. Invalid JSON, a non-object, a missing or unknown
    /// `type`, or a field of the wrong JSON type all count as malformed.
    pub fn parse(text: &str) -> Result<Self, ChatError> {
        serde_json::from_str(text).map_err(|_| ChatError::MalformedFrame)
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A chat message as delivered to clients, denormalized with its author's
/// display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    pub avatar_color: String,
    pub role: UserRole,
    pub content: String,
    pub reply_to_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    /// A freshly persisted message, decorated with the sender's session.
    pub fn live(message: ChatMessage, sender: &Session) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            user_id: message.user_id,
            username: sender.display_name.clone(),
            avatar_color: sender.avatar_color.clone(),
            role: sender.role,
            content: message.content,
            reply_to_id: message.reply_to_id,
            created_at: message.created_at,
        }
    }
}

impl From<MessageWithAuthor> for MessageView {
    fn from(stored: MessageWithAuthor) -> Self {
        let MessageWithAuthor { message, author } = stored;
        let (username, avatar_color, role) = match author {
            Some(author) => (author.display_name, author.avatar_color, author.role),
            None => (
                UNKNOWN_AUTHOR_NAME.to_string(),
                DEFAULT_AVATAR_COLOR.to_string(),
                UserRole::Member,
            ),
        };

        Self {
            id: message.id,
            channel_id: message.channel_id,
            user_id: message.user_id,
            username,
            avatar_color,
            role,
            content: message.content,
            reply_to_id: message.reply_to_id,
            created_at: message.created_at,
        }
    }
}

/// A frame sent from the server to one or more clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    History {
        messages: Vec<MessageView>,
    },
    Message(MessageView),
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    Typing { user_id: String, username: String },
    #[serde(rename_all = "camelCase")]
    Presence {
        online_count: usize,
        channel_users: BTreeMap<String, Vec<String>>,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            message: err.client_message(),
        }
    }
}
