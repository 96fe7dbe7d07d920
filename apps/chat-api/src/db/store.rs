//! Boundary traits for the durable collaborators of the chat core.
//!
//! Backed by PostgreSQL in production and an in-memory map in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::message::{ChatMessage, MessageWithAuthor};
use crate::models::user::ChatUser;

/// Resolves user identities and records their online state.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<ChatUser>, StoreError>;

    async fn set_online(
        &self,
        user_id: &str,
        online: bool,
        last_seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Durable channel and message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn channel_exists(&self, channel_id: &str) -> Result<bool, StoreError>;

    async fn insert_message(
        &self,
        channel_id: &str,
        user_id: &str,
        content: &str,
        reply_to_id: Option<&str>,
    ) -> Result<ChatMessage, StoreError>;

    /// The `limit` most recent messages of a channel, newest first, each joined
    /// with its author's current profile when the author still exists.
    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageWithAuthor>, StoreError>;
}
