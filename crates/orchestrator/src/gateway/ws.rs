// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The room-protocol WebSocket endpoint. One connection can join
//! several session rooms at once, via a split-socket select loop
//! generalized from one bridge per connection to one forwarder task per
//! joined room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use base64::Engine;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::auth::AuthenticatedUser;
use super::AppState;
use crate::domain::SessionMode;
use crate::event::Room;

/// Sustained/burst caps on `terminal_input` bytes per connection.
const RATE_SUSTAINED_BYTES_PER_SEC: f64 = 64.0 * 1024.0;
const RATE_BURST_BYTES: f64 = 256.0 * 1024.0;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=...` — upgrade, authenticating via the query-string token
/// since browsers cannot set `Authorization` on the handshake request.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let raw_query = query.token.as_ref().map(|t| format!("token={t}"));
    let subject = match state.tokens.verify_ws_query(raw_query.as_deref()) {
        Ok(subject) => subject,
        Err(_) => {
            return axum::http::Response::builder()
                .status(401)
                .body(axum::body::Body::from("unauthorized"))
                .unwrap_or_default()
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_ws(socket, state, AuthenticatedUser(subject))).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    JoinSession { session_id: String },
    LeaveSession { session_id: String },
    TerminalInput { session_id: String, data: String },
    TerminalResize { session_id: String, cols: u16, rows: u16 },
    ToggleMode { session_id: String, mode: SessionMode },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame<'a> {
    Error { message: &'a str },
    Joined { session_id: &'a str },
    Left { session_id: &'a str },
}

/// Per-connection token bucket bounding `terminal_input` throughput.
struct RateLimiter {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl RateLimiter {
    fn new(refill_per_sec: f64, capacity: f64) -> Self {
        Self { tokens: capacity, capacity, refill_per_sec, last: Instant::now() }
    }

    fn allow(&mut self, cost: usize) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if self.tokens >= cost as f64 {
            self.tokens -= cost as f64;
            true
        } else {
            false
        }
    }
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, user: AuthenticatedUser) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (fwd_tx, mut fwd_rx) = mpsc::channel::<String>(256);
    let mut rooms: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut limiter = RateLimiter::new(RATE_SUSTAINED_BYTES_PER_SEC, RATE_BURST_BYTES);

    loop {
        tokio::select! {
            forwarded = fwd_rx.recv() => {
                match forwarded {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, &state, &user, &fwd_tx, &mut rooms, &mut limiter).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    for (_, handle) in rooms {
        handle.abort();
    }
}

async fn handle_frame(
    text: &str,
    state: &Arc<AppState>,
    user: &AuthenticatedUser,
    fwd_tx: &mpsc::Sender<String>,
    rooms: &mut HashMap<String, JoinHandle<()>>,
    limiter: &mut RateLimiter,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            send_error(fwd_tx, &format!("malformed frame: {e}")).await;
            return;
        }
    };

    match frame {
        ClientFrame::JoinSession { session_id } => {
            if rooms.contains_key(&session_id) {
                return;
            }
            if state.registry.get(&session_id).is_none() {
                send_error(fwd_tx, "session not found").await;
                return;
            }
            let subscription = state.bus.subscribe(Room::session(session_id.as_str()));
            let tx = fwd_tx.clone();
            let handle = tokio::spawn(async move {
                loop {
                    let event = subscription.recv().await;
                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    if tx.send(text).await.is_err() {
                        break;
                    }
                }
            });
            rooms.insert(session_id.clone(), handle);
            send_frame(fwd_tx, &ServerFrame::Joined { session_id: &session_id }).await;
        }
        ClientFrame::LeaveSession { session_id } => {
            if let Some(handle) = rooms.remove(&session_id) {
                handle.abort();
            }
            send_frame(fwd_tx, &ServerFrame::Left { session_id: &session_id }).await;
        }
        ClientFrame::TerminalInput { session_id, data } => {
            let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&data) else {
                send_error(fwd_tx, "terminal_input data must be base64").await;
                return;
            };
            if !limiter.allow(bytes.len()) {
                send_error(fwd_tx, "terminal_input rate limit exceeded").await;
                return;
            }
            let Some(handle) = state.registry.get(&session_id) else {
                send_error(fwd_tx, "session not found").await;
                return;
            };
            if let Err(e) = handle.terminal_input(user.0.clone(), Bytes::from(bytes)).await {
                send_error(fwd_tx, &e.to_string()).await;
            }
        }
        ClientFrame::TerminalResize { session_id, cols, rows } => {
            let Some(handle) = state.registry.get(&session_id) else {
                send_error(fwd_tx, "session not found").await;
                return;
            };
            if let Err(e) = handle.terminal_resize(user.0.clone(), cols, rows).await {
                send_error(fwd_tx, &e.to_string()).await;
            }
        }
        ClientFrame::ToggleMode { session_id, mode } => {
            let Some(handle) = state.registry.get(&session_id) else {
                send_error(fwd_tx, "session not found").await;
                return;
            };
            if let Err(e) = handle.enter_mode(user.0.clone(), mode).await {
                send_error(fwd_tx, &e.to_string()).await;
            }
        }
    }
}

async fn send_frame(fwd_tx: &mpsc::Sender<String>, frame: &ServerFrame<'_>) {
    if let Ok(text) = serde_json::to_string(frame) {
        let _ = fwd_tx.send(text).await;
    }
}

async fn send_error(fwd_tx: &mpsc::Sender<String>, message: &str) {
    send_frame(fwd_tx, &ServerFrame::Error { message }).await;
    debug!(reason = message, "ws frame rejected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_burst_then_throttles() {
        let mut limiter = RateLimiter::new(1024.0, 2048.0);
        assert!(limiter.allow(2048));
        assert!(!limiter.allow(1));
    }
}
