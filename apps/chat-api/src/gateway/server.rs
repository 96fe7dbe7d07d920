//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::AppState;

use super::handler;
use super::session::ConnectionId;

/// Well-known path clients connect to.
pub const CHAT_PATH: &str = "/ws/chat";

pub fn router() -> Router<AppState> {
    Router::new().route(CHAT_PATH, get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let conn_id = ConnectionId::new();
    let (ws_tx, mut ws_rx) = socket.split();
    let (outbox, outbox_rx) = mpsc::channel(state.config.outbox_capacity);

    state.registry.attach(conn_id.clone(), outbox);
    tracing::info!(%conn_id, "chat connection opened");

    let writer = tokio::spawn(write_outbox(ws_tx, outbox_rx));

    // Frames from one connection are handled strictly in arrival order.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => handler::handle_frame(&state, &conn_id, text.as_str()).await,
            Ok(Message::Binary(_)) => handler::reject(&state, &conn_id, &ChatError::MalformedFrame),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ws read error");
                break;
            }
        }
    }

    // Removing the connection drops the only outbox sender, so the writer
    // drains anything still queued and then exits.
    handler::handle_disconnect(&state, &conn_id).await;
    if let Err(e) = writer.await {
        tracing::debug!(%conn_id, error = %e, "outbox writer ended abnormally");
    }

    tracing::info!(%conn_id, "chat connection closed");
}

async fn write_outbox(mut ws_tx: SplitSink<WebSocket, Message>, mut outbox: mpsc::Receiver<Message>) {
    while let Some(msg) = outbox.recv().await {
        if ws_tx.send(msg).await.is_err() {
            return;
        }
    }
    let _ = ws_tx.close().await;
}
