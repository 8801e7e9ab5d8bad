//! Test helpers for integration tests
//!
//! Provides an in-process backend with the token endpoints, one protected endpoint,
//! and the chat socket, plus client builders pointed at it.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use consult_common::ClientConfig;
use consult_realtime::{ChatSocket, ConnectionState};
use consult_session::{Navigator, SessionClient};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::fixtures::{TEST_EMAIL, TEST_PASSWORD};

/// Close code the backend uses for bad socket tokens
pub const AUTH_REJECTED: u16 = 4001;

/// Something pushed to every socket in a room
#[derive(Debug, Clone)]
enum RoomEvent {
    Frame(String),
    Kick(u16),
}

/// Backend state shared by all handlers
#[derive(Default)]
pub struct Backend {
    access: Mutex<HashSet<String>>,
    refresh: Mutex<HashSet<String>>,
    rooms: Mutex<HashMap<String, broadcast::Sender<RoomEvent>>>,
    auth_headers: Mutex<Vec<String>>,
    refresh_calls: AtomicUsize,
    ws_connects: AtomicUsize,
}

impl Backend {
    fn issue_pair(&self) -> Value {
        let access = format!("acc-{}", uuid::Uuid::new_v4().simple());
        let refresh = format!("ref-{}", uuid::Uuid::new_v4().simple());
        self.access.lock().insert(access.clone());
        self.refresh.lock().insert(refresh.clone());
        json!({ "access": access, "refresh": refresh })
    }

    fn room(&self, room: &str) -> broadcast::Sender<RoomEvent> {
        self.rooms
            .lock()
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    /// Invalidate every issued access token
    pub fn expire_access_tokens(&self) {
        self.access.lock().clear();
    }

    /// Invalidate every issued refresh token
    pub fn revoke_refresh_tokens(&self) {
        self.refresh.lock().clear();
    }

    /// Close every socket in `room` with `code`
    pub fn kick_room(&self, room: &str, code: u16) {
        let _ = self.room(room).send(RoomEvent::Kick(code));
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn ws_connects(&self) -> usize {
        self.ws_connects.load(Ordering::SeqCst)
    }

    /// `Authorization` headers seen by the protected endpoint, oldest first
    pub fn auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().clone()
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on an ephemeral port
    pub async fn start() -> Result<Self> {
        let backend = Arc::new(Backend::default());
        let app = create_app(backend.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            backend,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointed at this server with fast reconnects
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_api(self.base_url());
        config.api.refresh_timeout_secs = 5;
        config.realtime.reconnect_base_delay_ms = 50;
        config.realtime.reconnect_max_delay_ms = 200;
        config
    }

    /// Session client with an in-memory refresh token store
    pub fn session(&self, navigator: Arc<dyn Navigator>) -> Result<SessionClient> {
        let config = self.config();
        Ok(SessionClient::builder(config.api)
            .routes(config.routes)
            .navigator(navigator)
            .build()?)
    }

    /// Session client persisting its refresh token at `path`
    pub fn session_with_file(
        &self,
        navigator: Arc<dyn Navigator>,
        path: &std::path::Path,
    ) -> Result<SessionClient> {
        let config = self.config();
        Ok(SessionClient::builder(config.api)
            .routes(config.routes)
            .navigator(navigator)
            .refresh_token_path(Some(path.to_path_buf()))
            .build()?)
    }
}

/// Wait until the socket state satisfies `pred`
pub async fn wait_for_state(
    socket: &ChatSocket,
    pred: impl FnMut(&ConnectionState) -> bool,
) -> Result<ConnectionState> {
    let mut rx = socket.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred)).await??;
    Ok(*state)
}

// ============================================================================
// Routes
// ============================================================================

fn create_app(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/token/", post(login))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/me/", get(me))
        .route("/ws/chat/:room/", get(chat_ws))
        .with_state(backend)
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    if body["email"] == TEST_EMAIL && body["password"] == TEST_PASSWORD {
        Json(backend.issue_pair()).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn refresh(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Keep the refresh window open long enough for concurrent callers to pile up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let known = body["refresh"]
        .as_str()
        .is_some_and(|token| backend.refresh.lock().remove(token));

    if known {
        Json(backend.issue_pair()).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    backend.auth_headers.lock().push(auth.clone());

    let valid = auth
        .strip_prefix("Bearer ")
        .is_some_and(|token| backend.access.lock().contains(token));

    if valid {
        Json(json!({ "email": TEST_EMAIL })).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn chat_ws(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    State(backend): State<Arc<Backend>>,
) -> Response {
    backend.ws_connects.fetch_add(1, Ordering::SeqCst);
    let authorized = query
        .get("token")
        .is_some_and(|token| backend.access.lock().contains(token));

    ws.on_upgrade(move |socket| chat_session(backend, room, authorized, socket))
}

async fn chat_session(backend: Arc<Backend>, room: String, authorized: bool, mut socket: WebSocket) {
    if !authorized {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: AUTH_REJECTED,
                reason: "invalid token".into(),
            })))
            .await;
        return;
    }

    let tx = backend.room(&room);
    let mut rx = tx.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(value) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let echo = match value["type"].as_str() {
                        Some("chat_message") => {
                            json!({ "type": "chat_message", "text": value["text"], "sender_id": 1 })
                        }
                        Some("typing") => {
                            json!({ "type": "typing", "user_id": 1, "is_typing": value["is_typing"] })
                        }
                        _ => continue,
                    };
                    let _ = tx.send(RoomEvent::Frame(echo.to_string()));
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = rx.recv() => match event {
                Ok(RoomEvent::Frame(text)) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(RoomEvent::Kick(code)) => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: "kicked".into(),
                        })))
                        .await;
                    break;
                }
                Err(_) => break,
            },
        }
    }
}
