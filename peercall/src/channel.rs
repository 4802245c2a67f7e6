//! WebSocket signal channel to the relay server.
//!
//! Carries [`SignalMessage`] values between this peer and whichever peer
//! the relay has paired it with. The channel is deliberately thin: no
//! registration handshake, no reconnection, no buffering beyond the inbound
//! queue. Admission rejection (a full session) and peer loss both surface
//! the same way — the connection closes and [`SignalChannel::recv`] returns
//! [`ChannelError::ConnectionClosed`]; the relay never sends an explicit
//! notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use peercall_proto::signal::{self, SignalError, SignalMessage};

use crate::config::ClientConfig;

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default timeout for connecting to the relay server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the inbound message queue.
const INCOMING_BUFFER: usize = 64;

/// Errors that can occur on the signal channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The connection to the relay has been closed.
    #[error("signal channel closed")]
    ConnectionClosed,

    /// The operation timed out before completing.
    #[error("signal channel operation timed out")]
    Timeout,

    /// The relay URL is not a valid WebSocket URL.
    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),

    /// A message could not be encoded for transmission.
    #[error(transparent)]
    Codec(#[from] SignalError),

    /// An underlying I/O error occurred.
    #[error("signal channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// WebSocket channel to the relay server.
///
/// Created via [`SignalChannel::connect`], which establishes the WebSocket
/// connection and spawns a background reader task. The relay admits at most
/// two concurrent connections; a refused connection completes the WebSocket
/// handshake and is then closed by the server with no data exchanged.
pub struct SignalChannel {
    /// The relay server URL (ws:// or wss://).
    relay_url: String,
    /// Write half of the WebSocket connection (shared for concurrent sends).
    ws_sender: Arc<Mutex<WsSender>>,
    /// Channel for messages decoded by the background reader task.
    incoming: Mutex<mpsc::Receiver<SignalMessage>>,
    /// Whether the WebSocket connection to the relay is active.
    connected: Arc<AtomicBool>,
    /// Handle to the background reader task, aborted on drop.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl SignalChannel {
    /// Connect to a relay server with the default connect timeout.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::InvalidUrl`] if `relay_url` does not parse as a
    ///   ws:// or wss:// URL.
    /// - [`ChannelError::Timeout`] if the connection attempt times out.
    /// - [`ChannelError::Io`] if the relay cannot be reached.
    pub async fn connect(relay_url: &str) -> Result<Self, ChannelError> {
        Self::connect_with_timeout(relay_url, CONNECT_TIMEOUT).await
    }

    /// Connect to the relay named by a resolved [`ClientConfig`], honoring
    /// its `connect_timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`SignalChannel::connect`].
    pub async fn connect_with_config(config: &ClientConfig) -> Result<Self, ChannelError> {
        Self::connect_with_timeout(&config.relay_url, config.connect_timeout).await
    }

    async fn connect_with_timeout(
        relay_url: &str,
        connect_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let parsed = url::Url::parse(relay_url)
            .map_err(|e| ChannelError::InvalidUrl(format!("{relay_url}: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ChannelError::InvalidUrl(format!(
                "{relay_url}: expected ws:// or wss:// scheme"
            )));
        }

        let (ws_stream, _response) =
            tokio::time::timeout(connect_timeout, connect_async(relay_url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = relay_url, "relay WebSocket connect timed out");
                    ChannelError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = relay_url, err = %e, "relay WebSocket connect failed");
                    ChannelError::Io(std::io::Error::other(e))
                })?;

        let (ws_sender, ws_reader) = ws_stream.split();

        let (tx, rx) = mpsc::channel(INCOMING_BUFFER);
        let connected = Arc::new(AtomicBool::new(true));
        let reader_connected = Arc::clone(&connected);
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx, reader_connected));

        tracing::info!(url = relay_url, "connected to signaling relay");

        Ok(Self {
            relay_url: relay_url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            incoming: Mutex::new(rx),
            connected,
            reader_handle,
        })
    }

    /// Send a signaling message to the paired peer via the relay.
    ///
    /// Note that the relay drops messages silently while no peer is paired;
    /// `Ok(())` means the frame was handed to the relay, not delivered.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::ConnectionClosed`] if the relay connection is down.
    /// - [`ChannelError::Codec`] if the message cannot be encoded.
    pub async fn send(&self, msg: &SignalMessage) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(ChannelError::ConnectionClosed);
        }

        let text = signal::encode(msg)?;
        let mut sender = self.ws_sender.lock().await;
        sender.send(Message::Text(text.into())).await.map_err(|e| {
            tracing::warn!(err = %e, "signal send failed");
            self.connected.store(false, Ordering::Relaxed);
            ChannelError::ConnectionClosed
        })?;

        Ok(())
    }

    /// Receive the next signaling message from the paired peer.
    ///
    /// Blocks until a message arrives from the background reader task.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConnectionClosed`] once the relay connection
    /// has been lost — this is also how admission rejection and silent peer
    /// departure are observed.
    pub async fn recv(&self) -> Result<SignalMessage, ChannelError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ChannelError::ConnectionClosed)
    }

    /// Whether the relay connection is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// The relay server URL this channel is connected to.
    #[must_use]
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Close the channel gracefully, sending a close frame to the relay.
    ///
    /// Dropping the channel also disconnects (the relay observes the socket
    /// closing either way); this method just makes the close frame explicit.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::Relaxed);
        let mut sender = self.ws_sender.lock().await;
        if let Err(e) = sender.send(Message::Close(None)).await {
            tracing::debug!(err = %e, "close frame not delivered");
        }
    }
}

impl Drop for SignalChannel {
    fn drop(&mut self) {
        // The reader task owns the read half of the split stream. Abort it
        // so both halves are released and the relay sees the disconnect.
        self.reader_handle.abort();
    }
}

/// Background task that reads WebSocket frames and decodes them.
///
/// Malformed inbound frames are logged and skipped — the client is lenient
/// where the relay is strict. Sets `connected` to `false` when the
/// WebSocket closes or errors out.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<SignalMessage>,
    connected: Arc<AtomicBool>,
) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match signal::decode(text.as_str()) {
                Ok(msg) => {
                    if tx.send(msg).await.is_err() {
                        // Receiver dropped: the channel was dropped, exit.
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed signaling frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("relay WebSocket closed by server");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {
                // Signaling is text-only; ignore everything else.
            }
            Err(e) => {
                tracing::warn!(err = %e, "relay WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    tracing::info!("signal reader task exiting");
}
