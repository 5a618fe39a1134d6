//! WebSocket transport over `tokio-tungstenite`.
//!
//! The stream is split into reader and writer halves so the receive loop
//! and `send` never wait on each other. Closing flips a watch flag that
//! wakes a receive blocked on the reader, then runs the close handshake
//! under a timeout so a peer that stopped reading cannot stall it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Frame;

use super::{Connector, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Default bound on the close handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Dials WebSocket endpoints with `tokio-tungstenite`.
///
/// The handshake carries an `Origin` header derived from the endpoint
/// (`scheme://host[:port]`, with a default port omitted).
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    /// Bound on the close handshake of every dialed transport.
    close_timeout: Duration,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl WebSocketConnector {
    /// Creates a new connector.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long `close` waits for the close handshake.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Returns the close handshake bound.
    #[inline]
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn dial(&self, url: &Url) -> Result<Arc<dyn Transport>> {
        let mut request = url.as_str().into_client_request()?;

        let origin = url.origin().ascii_serialization();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            request.headers_mut().insert(ORIGIN, value);
        }

        let (stream, response) = connect_async(request).await?;
        debug!(endpoint = %url, status = %response.status(), "WebSocket handshake completed");

        Ok(Arc::new(WebSocketTransport::new(stream, self.close_timeout)))
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// An established WebSocket connection.
pub struct WebSocketTransport {
    /// Write half.
    writer: Mutex<SplitSink<WsStream, Message>>,
    /// Read half.
    reader: Mutex<SplitStream<WsStream>>,
    /// Set once `close` is called.
    closed: watch::Sender<bool>,
    /// Bound on the close handshake.
    close_timeout: Duration,
}

impl WebSocketTransport {
    /// Wraps a connected stream.
    pub(crate) fn new(stream: WsStream, close_timeout: Duration) -> Self {
        let (writer, reader) = stream.split();
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            closed: watch::Sender::new(false),
            close_timeout,
        }
    }

    /// Returns `true` once `close` has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Reads until the next data frame, skipping control frames.
    async fn next_frame(&self) -> Result<Frame> {
        let mut reader = self.reader.lock().await;

        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data.to_vec())),
                Some(Ok(Message::Close(close))) => {
                    debug!(?close, "WebSocket closed by remote");
                    return Err(Error::ConnectionClosed);
                }
                Some(Ok(_)) => trace!("Skipping control frame"),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let mut writer = self.writer.lock().await;
        writer.send(frame.into()).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Frame> {
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(Error::ConnectionClosed),
            frame = self.next_frame() => frame,
        }
    }

    /// Marks the transport closed and sends a close frame.
    ///
    /// Waiting for the writer lock and flushing both count against the
    /// close timeout. On timeout the handshake is abandoned; the socket is
    /// released when the last reference to the transport drops.
    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);

        let handshake = async {
            let mut writer = self.writer.lock().await;
            writer.close().await
        };

        match timeout(self.close_timeout, handshake).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                debug!(timeout = ?self.close_timeout, "Close handshake timed out");
                Err(Error::close_timeout(self.close_timeout.as_millis() as u64))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
