//! Per-connection chat state.

use std::fmt;

use chat_common::id::prefix;
use chat_common::PrefixedId;

use crate::models::user::{ChatUser, UserRole};

/// Process-unique handle for one live WebSocket connection (`conn_` prefixed ULID).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Self::generate())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixedId for ConnectionId {
    const PREFIX: &'static str = prefix::CONNECTION;
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Binds a connection to a user identity and its current channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub avatar_color: String,
    pub role: UserRole,
    pub channel_id: String,
    /// Registration order, assigned by the registry. Orders presence rosters.
    pub joined_seq: u64,
}

impl Session {
    pub fn new(user: &ChatUser, channel_id: impl Into<String>) -> Self {
        Self {
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            avatar_color: user.avatar_color.clone(),
            role: user.role,
            channel_id: channel_id.into(),
            joined_seq: 0,
        }
    }
}

/// Lifecycle of a connection. A closed connection is simply absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, no `join` accepted yet.
    Unjoined,
    Joined(Session),
}

impl ConnectionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Unjoined => None,
            Self::Joined(session) => Some(session),
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            Self::Unjoined => None,
            Self::Joined(session) => Some(session),
        }
    }
}
