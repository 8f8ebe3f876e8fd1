//! The transport seam between the engine and the wire.
//!
//! [`EventTransport`] abstracts "open a connection to a URL"; the engine
//! consumes [`TransportFrame`]s from whatever connection comes back.
//! [`WsTransport`] is the production implementation over
//! `tokio-tungstenite`; tests substitute scripted transports.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use stbl_core::error::EventError;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Where the engine's connection lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and none pending.
    Disconnected,
    /// An initial `connect()` is in flight.
    Connecting,
    /// Live.
    Connected,
    /// The peer closed the connection; reconnection follows.
    Closed,
    /// The connection failed; reconnection follows.
    Failed,
    /// A backoff timer or reopen is in flight.
    Reconnecting,
    /// The attempt budget is spent. Only a fresh `connect()` leaves this.
    GivenUp,
}

/// One unit of input from a live connection.
#[derive(Debug)]
pub enum TransportFrame {
    /// A textual payload (one event per frame).
    Message(String),
    /// The peer closed the connection cleanly.
    Closed,
    /// The connection failed.
    Error(String),
}

/// A live connection: a frame stream plus a close handle.
pub struct TransportConn {
    frames: mpsc::Receiver<TransportFrame>,
    closer: Option<oneshot::Sender<()>>,
}

impl TransportConn {
    pub fn new(frames: mpsc::Receiver<TransportFrame>, closer: Option<oneshot::Sender<()>>) -> Self {
        Self { frames, closer }
    }

    /// Split into the frame receiver (owned by the engine's read task) and
    /// the close handle (held for `disconnect()`).
    pub fn into_parts(self) -> (mpsc::Receiver<TransportFrame>, Option<oneshot::Sender<()>>) {
        (self.frames, self.closer)
    }
}

/// Opens connections to an event stream URL.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportConn, EventError>;
}

/// WebSocket transport over `tokio-tungstenite`.
pub struct WsTransport;

#[async_trait]
impl EventTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<TransportConn, EventError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| EventError::Connection(e.to_string()))?;
        debug!(url, status = %response.status(), "WebSocket connected");

        let (mut sink, mut source) = stream.split();
        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (close_tx, mut close_rx) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    msg = source.next() => {
                        let frame = match msg {
                            Some(Ok(Message::Text(text))) => TransportFrame::Message(text.to_string()),
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = sink.send(Message::Pong(payload)).await;
                                continue;
                            }
                            Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => continue,
                            Some(Ok(Message::Close(_))) | None => TransportFrame::Closed,
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket read failed");
                                TransportFrame::Error(e.to_string())
                            }
                        };
                        let terminal = !matches!(frame, TransportFrame::Message(_));
                        if frame_tx.send(frame).await.is_err() || terminal {
                            break;
                        }
                    }
                }
            }
        });

        Ok(TransportConn::new(frame_rx, Some(close_tx)))
    }
}
