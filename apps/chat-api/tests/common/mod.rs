#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chat_api::config::Config;
use chat_api::db::memory::MemoryStore;
use chat_api::db::seed;
use chat_api::gateway::server::CHAT_PATH;
use chat_api::models::user::{ChatUser, UserRole};
use chat_api::AppState;

/// How long to wait for a frame that should arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);
/// How long to wait before concluding no frame is coming.
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

/// Seeded store: default channels plus three users.
pub fn test_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed::seed_default_channels(&store);
    store.insert_user(ChatUser::new("u1", "ada", "Ada Lovelace", "#e11d48", UserRole::Member));
    store.insert_user(ChatUser::new("u2", "grace", "Grace Hopper", "#2563eb", UserRole::Admin));
    store.insert_user(ChatUser::new("bot", "helper", "Helper Bot", "#16a34a", UserRole::Bot));
    store
}

/// Build the full application router wired to a fresh in-memory state.
pub fn test_app() -> (axum::Router, AppState, Arc<MemoryStore>) {
    let store = test_store();
    let state = AppState::in_memory(Config::default(), store.clone());
    let app = chat_api::routes::router().with_state(state.clone());
    (app, state, store)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the background.
pub async fn start_server() -> TestServer {
    let store = test_store();
    let state = AppState::in_memory(Config::default(), store.clone());
    serve(state, store).await
}

/// Serve a caller-assembled state; `store` stays reachable for assertions.
pub async fn serve(state: AppState, store: Arc<MemoryStore>) -> TestServer {
    let app = chat_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state, store }
}

pub struct ChatClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ChatClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}{CHAT_PATH}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("ws connect");
        Self { ws }
    }

    pub async fn send(&mut self, frame: Value) {
        self.send_raw(&frame.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(tungstenite::Message::Text(text.to_string().into()))
            .await
            .expect("send frame");
    }

    pub async fn send_binary(&mut self, bytes: Vec<u8>) {
        self.ws
            .send(tungstenite::Message::Binary(bytes.into()))
            .await
            .expect("send binary frame");
    }

    /// Next JSON frame from the server.
    pub async fn recv(&mut self) -> Value {
        loop {
            let msg = time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timeout waiting for frame")
                .expect("stream ended")
                .expect("ws read error");

            match msg {
                tungstenite::Message::Text(text) => {
                    return serde_json::from_str(&text).expect("frame is JSON");
                }
                tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
                other => panic!("unexpected ws message: {other:?}"),
            }
        }
    }

    /// Next frame, asserting its `type`.
    pub async fn expect(&mut self, frame_type: &str) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame["type"], frame_type, "unexpected frame: {frame}");
        frame
    }

    /// Skip frames until one of the given `type` arrives.
    pub async fn recv_until(&mut self, frame_type: &str) -> Value {
        loop {
            let frame = self.recv().await;
            if frame["type"] == frame_type {
                return frame;
            }
        }
    }

    /// Assert that nothing arrives within a short window.
    pub async fn expect_silence(&mut self) {
        if let Ok(Some(Ok(msg))) = time::timeout(SILENCE_WINDOW, self.ws.next()).await {
            panic!("expected no frame, got: {msg:?}");
        }
    }

    /// Join and return the history frame. The presence frame that follows is left unread.
    pub async fn join(&mut self, user_id: &str, channel_id: &str) -> Value {
        self.send(json!({ "type": "join", "userId": user_id, "channelId": channel_id }))
            .await;
        self.expect("history").await
    }

    /// Join and consume both the history and the presence frames.
    pub async fn join_settled(&mut self, user_id: &str, channel_id: &str) -> Value {
        let history = self.join(user_id, channel_id).await;
        self.expect("presence").await;
        history
    }

    /// Send a chat message and wait for its echo.
    pub async fn say(&mut self, content: &str) -> Value {
        self.send(json!({ "type": "message", "content": content })).await;
        self.expect("message").await
    }

    pub async fn close(mut self) {
        self.ws.close(None).await.expect("close");
    }
}

/// Poll until the condition holds or the receive timeout elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = time::Instant::now() + RECV_TIMEOUT;
    while !condition() {
        assert!(time::Instant::now() < deadline, "condition not met in time");
        time::sleep(Duration::from_millis(10)).await;
    }
}
