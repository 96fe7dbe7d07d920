//! Connection registry: the single source of truth for who is connected, as
//! whom, and in which channel.
//!
//! Keyed by connection, not by user, so one user may hold many sessions.
//! Every operation is atomic on its own; callers must not assume two calls
//! observe the same state.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::session::{ConnectionId, ConnectionState, Session};

/// Outbound queue feeding a connection's socket writer.
pub type Outbox = mpsc::Sender<Message>;

struct ConnectionEntry {
    outbox: Outbox,
    state: ConnectionState,
}

/// Why a session could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The connection already held a session. The new one replaced it.
    DuplicateRegistration,
    /// The connection closed while the caller was preparing the session.
    ConnectionClosed,
}

pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    next_seq: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Track a freshly opened connection in the `Unjoined` state.
    pub fn attach(&self, conn_id: ConnectionId, outbox: Outbox) {
        self.connections.insert(
            conn_id,
            ConnectionEntry {
                outbox,
                state: ConnectionState::Unjoined,
            },
        );
    }

    /// Bind a session to an open connection.
    pub fn register(&self, conn_id: &ConnectionId, mut session: Session) -> Result<(), RegisterError> {
        let Some(mut entry) = self.connections.get_mut(conn_id) else {
            return Err(RegisterError::ConnectionClosed);
        };

        session.joined_seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = std::mem::replace(&mut entry.state, ConnectionState::Joined(session));

        if let ConnectionState::Joined(old) = previous {
            tracing::warn!(
                %conn_id,
                old_user_id = %old.user_id,
                "connection registered twice, replacing session"
            );
            return Err(RegisterError::DuplicateRegistration);
        }
        Ok(())
    }

    /// Mutate a connection's session in place. Returns `false` (and does
    /// nothing) when the connection has no session.
    pub fn update(&self, conn_id: &ConnectionId, mutator: impl FnOnce(&mut Session)) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut entry) => match entry.state.session_mut() {
                Some(session) => {
                    mutator(session);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Forget a connection entirely. Returns its session, if it had one.
    /// Safe to call more than once.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Session> {
        let (_, entry) = self.connections.remove(conn_id)?;
        match entry.state {
            ConnectionState::Joined(session) => Some(session),
            ConnectionState::Unjoined => None,
        }
    }

    /// Snapshot of a connection's state, `None` if the connection is closed.
    pub fn state(&self, conn_id: &ConnectionId) -> Option<ConnectionState> {
        self.connections.get(conn_id).map(|entry| entry.state.clone())
    }

    pub fn session(&self, conn_id: &ConnectionId) -> Option<Session> {
        self.connections
            .get(conn_id)
            .and_then(|entry| entry.state.session().cloned())
    }

    /// All sessions, in registration order.
    pub fn all_sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .connections
            .iter()
            .filter_map(|entry| entry.state.session().cloned())
            .collect();
        sessions.sort_by_key(|s| s.joined_seq);
        sessions
    }

    /// Sessions currently in a channel, in registration order.
    pub fn sessions_in_channel(&self, channel_id: &str) -> Vec<Session> {
        let mut sessions = self.all_sessions();
        sessions.retain(|s| s.channel_id == channel_id);
        sessions
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.connections.iter().any(|entry| {
            entry
                .state
                .session()
                .is_some_and(|s| s.user_id == user_id)
        })
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn session_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.state.session().is_some())
            .count()
    }

    /// Queue `message` for every connection accepted by `filter`. A connection
    /// whose queue is closed or full is skipped. Returns the number of
    /// connections the message was queued for.
    pub fn deliver(
        &self,
        message: &Message,
        filter: impl Fn(&ConnectionId, &ConnectionState) -> bool,
    ) -> usize {
        let mut delivered = 0;
        for entry in self.connections.iter() {
            if !filter(entry.key(), &entry.state) {
                continue;
            }
            if try_queue(entry.key(), &entry.outbox, message.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Queue `message` for a single connection.
    pub fn send_to(&self, conn_id: &ConnectionId, message: Message) -> bool {
        match self.connections.get(conn_id) {
            Some(entry) => try_queue(conn_id, &entry.outbox, message),
            None => false,
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn try_queue(conn_id: &ConnectionId, outbox: &Outbox, message: Message) -> bool {
    match outbox.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(%conn_id, "dropping frame for closed connection");
            false
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!(%conn_id, "outbound queue full, dropping frame");
            false
        }
    }
}
