use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};

use deadeye_core::net::messages::{PeerId, WelcomeMsg};
use deadeye_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_join_lobby, encode_welcome,
};

use crate::relay::{RelayState, SharedRelayState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayConfig {
    pub max_lobbies: usize,
    /// Token bucket size per connection.
    pub burst: f64,
    /// Tokens refilled per second per connection.
    pub refill_per_sec: f64,
    /// Frames queued for a peer before further frames to it are dropped.
    pub peer_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_lobbies: 100,
            burst: 100.0,
            refill_per_sec: 100.0,
            peer_queue_capacity: 256,
        }
    }
}

#[derive(Clone)]
struct AppState {
    relay: SharedRelayState,
    config: RelayConfig,
}

/// Build the relay router. The returned state handle lets callers inspect
/// lobbies.
pub fn build_app(config: RelayConfig) -> (Router, SharedRelayState) {
    let relay: SharedRelayState = Arc::new(RwLock::new(RelayState::new(config.max_lobbies)));
    let app = Router::new()
        .route("/relay", axum::routing::get(relay_ws_handler))
        .with_state(AppState {
            relay: Arc::clone(&relay),
            config,
        });
    (app, relay)
}

async fn relay_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_relay_socket(socket, state))
}

async fn handle_relay_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut ws_receiver) = socket.split();

    // First frame must be a JoinLobby.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data.to_vec(),
        _ => return,
    };
    let join = match decode_join_lobby(&first_msg) {
        Ok(j) => j,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected connection without JoinLobby");
            return;
        },
    };
    if join.protocol_version != PROTOCOL_VERSION {
        tracing::warn!(
            lobby = %join.lobby,
            version = join.protocol_version,
            expected = PROTOCOL_VERSION,
            "Protocol version mismatch"
        );
        return;
    }

    let (tx, rx) = mpsc::channel::<Vec<u8>>(state.config.peer_queue_capacity.max(1));
    let peer_id = {
        let mut relay = state.relay.write().await;
        match relay.join(&join.lobby, tx.clone()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(lobby = %join.lobby, error = %e, "Failed to join relay lobby");
                return;
            },
        }
    };

    match encode_welcome(&WelcomeMsg { peer_id }) {
        Ok(welcome) => {
            let _ = tx.try_send(welcome);
        },
        Err(e) => tracing::warn!(error = %e, "Failed to encode Welcome"),
    }
    drop(tx);
    tracing::info!(lobby = %join.lobby, peer_id, "Peer joined relay lobby");

    spawn_relay_writer(ws_sender, rx);
    peer_read_loop(&mut ws_receiver, &state, &join.lobby, peer_id).await;

    let mut relay = state.relay.write().await;
    let removed = relay.leave(&join.lobby, peer_id);
    tracing::info!(lobby = %join.lobby, peer_id, lobby_removed = removed, "Peer left relay lobby");
}

fn spawn_relay_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Vec<u8>>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data.into())).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection token bucket.
pub struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl RateLimiter {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    pub fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn peer_read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    lobby: &str,
    peer_id: PeerId,
) {
    let mut rate_limiter = RateLimiter::new(state.config.burst, state.config.refill_per_sec);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };
        if data.is_empty() {
            continue;
        }
        if data.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(lobby, peer_id, size = data.len(), "Oversized frame dropped");
            continue;
        }
        if !rate_limiter.allow() {
            tracing::warn!(lobby, peer_id, "Peer rate limited");
            continue;
        }

        let relay = state.relay.read().await;
        if relay.route(lobby, peer_id, &data) == 0 {
            tracing::debug!(lobby, peer_id, tag = data[0], "Frame not routed");
        }
    }
}
