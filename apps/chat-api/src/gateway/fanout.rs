//! Fanout of server frames to live connections.
//!
//! A frame is serialized once; each matching connection gets a cheap clone of
//! the encoded text. Connections that stopped accepting frames are skipped
//! silently: their own close event reconciles the registry.

use axum::extract::ws::{Message, Utf8Bytes};

use super::events::ServerFrame;
use super::registry::ConnectionRegistry;
use super::session::{ConnectionId, ConnectionState};

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy)]
pub enum Audience<'a> {
    /// Every open connection, joined or not.
    Everyone,
    /// Sessions currently in `channel_id`, optionally minus one connection.
    Channel {
        channel_id: &'a str,
        except: Option<&'a ConnectionId>,
    },
}

impl<'a> Audience<'a> {
    pub fn channel(channel_id: &'a str) -> Self {
        Self::Channel {
            channel_id,
            except: None,
        }
    }

    pub fn channel_except(channel_id: &'a str, except: &'a ConnectionId) -> Self {
        Self::Channel {
            channel_id,
            except: Some(except),
        }
    }

    fn includes(&self, conn_id: &ConnectionId, state: &ConnectionState) -> bool {
        match self {
            Self::Everyone => true,
            Self::Channel { channel_id, except } => {
                if except.is_some_and(|skip| skip == conn_id) {
                    return false;
                }
                state
                    .session()
                    .is_some_and(|s| s.channel_id == *channel_id)
            }
        }
    }
}

fn encode(frame: &ServerFrame) -> Option<Utf8Bytes> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(json.into()),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode server frame");
            None
        }
    }
}

/// Broadcast a frame. Returns how many connections it was queued for.
pub fn broadcast(registry: &ConnectionRegistry, audience: Audience<'_>, frame: &ServerFrame) -> usize {
    let Some(text) = encode(frame) else {
        return 0;
    };
    registry.deliver(&Message::Text(text), |conn_id, state| {
        audience.includes(conn_id, state)
    })
}

/// Send a frame to a single connection.
pub fn send(registry: &ConnectionRegistry, conn_id: &ConnectionId, frame: &ServerFrame) -> bool {
    match encode(frame) {
        Some(text) => registry.send_to(conn_id, Message::Text(text)),
        None => false,
    }
}
