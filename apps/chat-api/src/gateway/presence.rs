//! Presence: the process-wide summary of who is online and where.
//!
//! The snapshot is recomputed from the registry on every membership change
//! rather than patched incrementally. Durable online flags are written through
//! [`OnlineTracker`], which serializes writes per user so the flag always
//! agrees with the registry.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::store::IdentitySource;
use crate::error::StoreError;

use super::events::ServerFrame;
use super::fanout::{self, Audience};
use super::registry::ConnectionRegistry;
use super::session::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    /// Distinct user ids across all sessions.
    pub online_count: usize,
    /// Channel id → distinct display names, in first-seen order.
    pub channel_users: BTreeMap<String, Vec<String>>,
}

impl PresenceSnapshot {
    /// Build a snapshot from sessions given in registration order.
    pub fn compute(sessions: &[Session]) -> Self {
        let online_count = sessions
            .iter()
            .map(|s| s.user_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut channel_users: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for session in sessions {
            let roster = channel_users.entry(session.channel_id.clone()).or_default();
            if !roster.contains(&session.display_name) {
                roster.push(session.display_name.clone());
            }
        }

        Self {
            online_count,
            channel_users,
        }
    }

    pub fn into_frame(self) -> ServerFrame {
        ServerFrame::Presence {
            online_count: self.online_count,
            channel_users: self.channel_users,
        }
    }
}

/// Recompute presence and send it to every open connection.
pub fn broadcast_presence(registry: &ConnectionRegistry) -> PresenceSnapshot {
    let snapshot = PresenceSnapshot::compute(&registry.all_sessions());
    fanout::broadcast(registry, Audience::Everyone, &snapshot.clone().into_frame());
    snapshot
}

/// Per-user serialization of durable online-flag writes.
pub struct OnlineTracker {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held while a user's online flag is being changed.
pub struct UserLock {
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for UserLock {
    fn drop(&mut self) {
        self.guard.take();
        // Nobody else holds or waits on the mutex once only the map references it.
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl OnlineTracker {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
        }
    }

    pub async fn lock(&self, user_id: &str) -> UserLock {
        let mutex = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        UserLock {
            user_id: user_id.to_string(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Mark the user offline if the registry holds no session for them.
    /// Must be called with the user's lock held.
    pub async fn reconcile_offline(
        &self,
        _lock: &UserLock,
        identity: &dyn IdentitySource,
        registry: &ConnectionRegistry,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        if registry.has_user(user_id) {
            return Ok(false);
        }
        identity.set_online(user_id, false, Utc::now()).await?;
        Ok(true)
    }

    /// Number of users with a pending or held lock.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

impl Default for OnlineTracker {
    fn default() -> Self {
        Self::new()
    }
}
