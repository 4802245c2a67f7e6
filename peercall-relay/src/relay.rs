//! Relay server core: shared state, WebSocket handler, and message fan-out.
//!
//! The relay accepts WebSocket connections, consults the [`SessionRegistry`]
//! for admission, and forwards every text frame received from one session
//! member verbatim to the other. A connection beyond the second concurrent
//! one is closed immediately with no message exchange. A frame with no
//! paired peer is dropped silently — the relay has no message backlog.
//!
//! The relay validates that each frame is a well-formed signaling envelope
//! (a malformed frame is a protocol violation and closes that connection)
//! but never routes on the `type` tag and never touches payload contents:
//! the original text is forwarded byte-for-byte, in per-sender FIFO order.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use peercall_proto::signal;
use tokio::sync::mpsc;

use crate::registry::{EndpointId, SessionRegistry};

/// Default maximum allowed frame size in bytes (64 KB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Shared relay server state holding the session registry.
pub struct RelayState {
    /// Admission control and pairing, injected into every handler.
    pub registry: SessionRegistry,
    /// Maximum allowed text frame size in bytes.
    max_message_size: usize,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates a new relay state with an empty registry and the default
    /// frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Creates a new relay state with a custom frame size limit.
    #[must_use]
    pub fn with_config(max_message_size: usize) -> Self {
        Self {
            registry: SessionRegistry::new(),
            max_message_size,
        }
    }
}

/// Handles an upgraded WebSocket connection for a single endpoint.
///
/// The connection lifecycle:
/// 1. Mint an [`EndpointId`] and attempt registry admission.
/// 2. If the session is full, close the socket with no message exchange.
/// 3. Otherwise spawn a writer task and enter the reader loop, forwarding
///    each valid frame to the paired endpoint.
/// 4. On disconnect (clean close, error, or protocol violation), unregister.
///
/// The remaining peer gets no relay-level notification when its partner
/// leaves; it observes the loss through its own transport only.
pub async fn handle_socket(mut socket: WebSocket, state: Arc<RelayState>) {
    let id = EndpointId::new();

    // Channel feeding this endpoint's WebSocket writer task. Registered
    // before the socket is split so the peer can reach us immediately.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    if state.registry.register(id, tx).await.is_err() {
        tracing::info!(endpoint = %id, "session full, refusing connection");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let occupancy = state.registry.occupancy().await;
    tracing::info!(
        endpoint = %id,
        occupancy,
        "endpoint admitted"
    );

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Writer task: drains the channel into the WebSocket.
    let writer_id = id;
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(endpoint = %writer_id, "WebSocket write failed");
                break;
            }
        }
    });

    // Reader loop: one task per connection, so per-sender FIFO ordering
    // holds from socket read through the peer's channel.
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if !forward_frame(id, &text, &reader_state).await {
                        // Protocol violation: close rather than attempt
                        // partial interpretation.
                        break;
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!(endpoint = %id, "binary frame on text protocol, closing");
                    break;
                }
                Message::Close(_) => {
                    tracing::info!(endpoint = %id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore ping/pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.registry.unregister(id).await;
    tracing::info!(endpoint = %id, "endpoint disconnected and unregistered");
}

/// Validates one text frame and forwards it verbatim to the paired endpoint.
///
/// Returns `false` when the frame is a protocol violation (oversized or not
/// a well-formed signaling envelope) and the connection must be closed.
async fn forward_frame(id: EndpointId, text: &Utf8Bytes, state: &Arc<RelayState>) -> bool {
    if text.len() > state.max_message_size {
        tracing::warn!(
            endpoint = %id,
            size = text.len(),
            max = state.max_message_size,
            "frame exceeds size limit, closing"
        );
        return false;
    }

    if let Err(e) = signal::decode(text.as_str()) {
        tracing::warn!(endpoint = %id, error = %e, "malformed signaling message, closing");
        return false;
    }

    match state.registry.peer_of(id).await {
        Some(peer) => {
            tracing::debug!(endpoint = %id, bytes = text.len(), "forwarding to paired endpoint");
            if peer.send(Message::Text(text.clone())).is_err() {
                // The peer's writer task already exited; its own disconnect
                // path will unregister it. The frame is dropped.
                tracing::debug!(endpoint = %id, "peer channel closed, frame dropped");
            }
        }
        None => {
            // Lone endpoint: silent drop, never buffered for a future peer.
            tracing::debug!(endpoint = %id, "no paired endpoint, frame dropped");
        }
    }

    true
}

/// Starts the relay server on the given address and returns the bound
/// address and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(RelayState::new())).await
}

/// Starts the relay server with a pre-configured [`RelayState`].
///
/// Use [`RelayState::with_config`] to apply limits from the resolved
/// [`crate::config::RelayConfig`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<RelayState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<RelayState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
