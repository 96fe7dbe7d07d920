//! Inbound frame dispatch: the per-connection protocol state machine.
//!
//! Unjoined --join--> Joined --switch_channel/message/typing--> Joined
//! any state --disconnect--> closed (absent from the registry)
//!
//! Frames that need a session are ignored on connections without one. Any
//! handler that finds its session gone after awaiting storage stops quietly.

use chrono::Utc;

use crate::error::ChatError;
use crate::AppState;

use super::events::{ClientFrame, MessageView, ServerFrame};
use super::fanout::{self, Audience};
use super::history;
use super::presence;
use super::registry::RegisterError;
use super::session::{ConnectionId, ConnectionState, Session};

/// Maximum message length, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Handle one inbound text frame. Failures are reported to the sender only.
pub async fn handle_frame(state: &AppState, conn_id: &ConnectionId, text: &str) {
    let result = match ClientFrame::parse(text) {
        Ok(frame) => dispatch(state, conn_id, frame).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        reject(state, conn_id, &err);
    }
}

/// Report a rejected frame to its sender.
pub fn reject(state: &AppState, conn_id: &ConnectionId, err: &ChatError) {
    match err {
        ChatError::Storage(source) => {
            tracing::error!(%conn_id, error = %source, "storage failure while handling frame");
        }
        other => {
            tracing::debug!(%conn_id, reason = %other, "frame rejected");
        }
    }
    fanout::send(&state.registry, conn_id, &ServerFrame::error(err));
}

async fn dispatch(state: &AppState, conn_id: &ConnectionId, frame: ClientFrame) -> Result<(), ChatError> {
    match frame {
        ClientFrame::Join {
            user_id,
            channel_id,
        } => {
            let user_id = required(user_id, "userId")?;
            let channel_id = required(channel_id, "channelId")?;
            handle_join(state, conn_id, &user_id, &channel_id).await
        }
        ClientFrame::SwitchChannel { channel_id } => {
            handle_switch_channel(state, conn_id, channel_id).await
        }
        ClientFrame::Message {
            content,
            reply_to_id,
        } => handle_message(state, conn_id, content, reply_to_id).await,
        ClientFrame::Typing {} => {
            handle_typing(state, conn_id);
            Ok(())
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ChatError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ChatError::MissingField(field))
}

/// Trim and bound message content.
pub fn validate_content(content: Option<&str>) -> Result<&str, ChatError> {
    match content.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() && trimmed.chars().count() <= MAX_MESSAGE_CHARS => {
            Ok(trimmed)
        }
        _ => Err(ChatError::InvalidContent {
            max: MAX_MESSAGE_CHARS,
        }),
    }
}

async fn handle_join(
    state: &AppState,
    conn_id: &ConnectionId,
    user_id: &str,
    channel_id: &str,
) -> Result<(), ChatError> {
    match state.registry.state(conn_id) {
        None => return Ok(()),
        Some(ConnectionState::Joined(_)) => return Err(ChatError::DuplicateRegistration),
        Some(ConnectionState::Unjoined) => {}
    }

    let user = state
        .identity
        .resolve_user(user_id)
        .await?
        .ok_or(ChatError::UserNotFound)?;

    if !state.messages.channel_exists(channel_id).await? {
        return Err(ChatError::ChannelNotFound);
    }

    // Every fallible read happens before the session is committed.
    let messages = history::load_history(state.messages.as_ref(), channel_id).await?;

    let session = Session::new(&user, channel_id);
    {
        let lock = state.online.lock(&user.id).await;
        state.identity.set_online(&user.id, true, Utc::now()).await?;

        match state.registry.register(conn_id, session.clone()) {
            Ok(()) => {}
            Err(RegisterError::DuplicateRegistration) => {
                tracing::warn!(%conn_id, user_id = %user.id, "join raced with another join");
            }
            Err(RegisterError::ConnectionClosed) => {
                // The socket went away while we were validating.
                state
                    .online
                    .reconcile_offline(&lock, state.identity.as_ref(), &state.registry, &user.id)
                    .await?;
                return Ok(());
            }
        }
    }

    tracing::info!(
        %conn_id,
        user_id = %session.user_id,
        channel_id = %session.channel_id,
        "chat session joined"
    );

    fanout::send(&state.registry, conn_id, &ServerFrame::History { messages });

    fanout::broadcast(
        &state.registry,
        Audience::channel_except(channel_id, conn_id),
        &ServerFrame::UserJoined {
            user_id: session.user_id.clone(),
            username: session.display_name.clone(),
        },
    );
    presence::broadcast_presence(&state.registry);

    Ok(())
}

async fn handle_switch_channel(
    state: &AppState,
    conn_id: &ConnectionId,
    channel_id: Option<String>,
) -> Result<(), ChatError> {
    if state.registry.session(conn_id).is_none() {
        return Ok(());
    }
    let channel_id = required(channel_id, "channelId")?;

    if !state.messages.channel_exists(&channel_id).await? {
        return Err(ChatError::ChannelNotFound);
    }
    let messages = history::load_history(state.messages.as_ref(), &channel_id).await?;

    // Members of the old and new channel are not notified of a switch.
    let mut previous = None;
    let switched = state.registry.update(conn_id, |session| {
        previous = Some(std::mem::replace(&mut session.channel_id, channel_id.clone()));
    });
    if !switched {
        return Ok(());
    }

    tracing::info!(
        %conn_id,
        from = previous.as_deref().unwrap_or_default(),
        to = %channel_id,
        "chat session switched channel"
    );

    fanout::send(&state.registry, conn_id, &ServerFrame::History { messages });
    presence::broadcast_presence(&state.registry);

    Ok(())
}

async fn handle_message(
    state: &AppState,
    conn_id: &ConnectionId,
    content: Option<String>,
    reply_to_id: Option<String>,
) -> Result<(), ChatError> {
    let Some(session) = state.registry.session(conn_id) else {
        return Ok(());
    };

    let content = validate_content(content.as_deref())?;
    let reply_to_id = reply_to_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let message = state
        .messages
        .insert_message(&session.channel_id, &session.user_id, content, reply_to_id)
        .await?;

    if state.registry.session(conn_id).is_none() {
        tracing::debug!(%conn_id, message_id = %message.id, "sender left before broadcast");
        return Ok(());
    }

    let channel_id = message.channel_id.clone();
    // The sender is included: the echo doubles as its acknowledgement.
    fanout::broadcast(
        &state.registry,
        Audience::channel(&channel_id),
        &ServerFrame::Message(MessageView::live(message, &session)),
    );

    Ok(())
}

fn handle_typing(state: &AppState, conn_id: &ConnectionId) {
    let Some(session) = state.registry.session(conn_id) else {
        return;
    };

    fanout::broadcast(
        &state.registry,
        Audience::channel_except(&session.channel_id, conn_id),
        &ServerFrame::Typing {
            user_id: session.user_id.clone(),
            username: session.display_name.clone(),
        },
    );
}

/// Tear down a connection. Idempotent.
pub async fn handle_disconnect(state: &AppState, conn_id: &ConnectionId) {
    let Some(session) = state.registry.remove(conn_id) else {
        return;
    };

    {
        let lock = state.online.lock(&session.user_id).await;
        if let Err(err) = state
            .online
            .reconcile_offline(&lock, state.identity.as_ref(), &state.registry, &session.user_id)
            .await
        {
            tracing::error!(
                %conn_id,
                user_id = %session.user_id,
                error = %err,
                "failed to record user offline"
            );
        }
    }

    tracing::info!(
        %conn_id,
        user_id = %session.user_id,
        channel_id = %session.channel_id,
        "chat session left"
    );

    fanout::broadcast(
        &state.registry,
        Audience::channel(&session.channel_id),
        &ServerFrame::UserLeft {
            user_id: session.user_id.clone(),
            username: session.display_name.clone(),
        },
    );
    presence::broadcast_presence(&state.registry);
}
