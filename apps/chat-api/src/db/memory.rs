//! In-memory implementation of the storage traits, used when no database is
//! configured and throughout the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chat_common::SnowflakeGenerator;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::models::channel::ChatChannel;
use crate::models::message::{ChatMessage, MessageWithAuthor};
use crate::models::user::{Author, ChatUser};

use super::store::{IdentitySource, MessageStore};

#[derive(Default)]
struct Inner {
    users: HashMap<String, ChatUser>,
    channels: HashMap<String, ChatChannel>,
    /// Append-only, so index order is creation order.
    messages: Vec<ChatMessage>,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    snowflake: SnowflakeGenerator,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_worker_id(0)
    }

    pub fn with_worker_id(worker_id: u16) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            snowflake: SnowflakeGenerator::new(worker_id),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Insert or replace a user record.
    pub fn insert_user(&self, user: ChatUser) {
        self.inner.lock().users.insert(user.id.clone(), user);
    }

    /// Delete a user record. Their messages are kept.
    pub fn remove_user(&self, user_id: &str) -> Option<ChatUser> {
        self.inner.lock().users.remove(user_id)
    }

    /// Insert a channel unless one with the same id exists. Returns whether it was added.
    pub fn insert_channel(&self, channel: ChatChannel) -> bool {
        let mut inner = self.inner.lock();
        if inner.channels.contains_key(&channel.id) {
            return false;
        }
        inner.channels.insert(channel.id.clone(), channel);
        true
    }

    pub fn user(&self, user_id: &str) -> Option<ChatUser> {
        self.inner.lock().users.get(user_id).cloned()
    }

    pub fn channels(&self) -> Vec<ChatChannel> {
        let mut channels: Vec<ChatChannel> = self.inner.lock().channels.values().cloned().collect();
        channels.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        channels
    }

    pub fn message_count(&self, channel_id: &str) -> usize {
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .count()
    }

    /// Simulate an outage: while set, every trait call fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentitySource for MemoryStore {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<ChatUser>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().users.get(user_id).cloned())
    }

    async fn set_online(
        &self,
        user_id: &str,
        online: bool,
        last_seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(user) = self.inner.lock().users.get_mut(user_id) {
            user.is_online = online;
            user.last_seen_at = Some(last_seen_at);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn channel_exists(&self, channel_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().channels.contains_key(channel_id))
    }

    async fn insert_message(
        &self,
        channel_id: &str,
        user_id: &str,
        content: &str,
        reply_to_id: Option<&str>,
    ) -> Result<ChatMessage, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock();
        if !inner.channels.contains_key(channel_id) {
            return Err(StoreError::Integrity(format!(
                "chat_messages.channel_id references missing channel {channel_id}"
            )));
        }

        let message = ChatMessage {
            id: self.snowflake.generate().to_string(),
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            reply_to_id: reply_to_id.map(str::to_string),
            created_at: Utc::now(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageWithAuthor>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock();
        Ok(inner
            .messages
            .iter()
            .rev()
            .filter(|m| m.channel_id == channel_id)
            .take(limit)
            .map(|m| MessageWithAuthor {
                message: m.clone(),
                author: inner.users.get(&m.user_id).map(Author::from),
            })
            .collect())
    }
}
