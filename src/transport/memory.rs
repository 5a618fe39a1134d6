//! In-process transport.
//!
//! [`MemoryConnector`] hands out [`MemoryTransport`]s without touching the
//! network. Each successful dial also yields a [`MemoryPeer`], the remote
//! side of that connection, which can inject inbound frames, inspect what
//! the client sent, and close the connection from the remote end.
//!
//! Dial outcomes are scripted, which makes retry and reconnect behavior
//! deterministic to exercise.
//!
//! # Example
//!
//! ```ignore
//! let connector = MemoryConnector::echo();
//! connector.fail_next(2);
//!
//! let mut client = Client::builder().connector(connector.clone()).build();
//! client.connect("ws://memory/", 3, Duration::ZERO, false).await?;
//! assert_eq!(connector.dial_count(), 3);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Frame;

use super::{Connector, Transport};

// ============================================================================
// ConnectorState
// ============================================================================

/// Scripted behavior and dial history.
#[derive(Default)]
struct ConnectorState {
    /// Number of upcoming dials that fail.
    fail_remaining: u32,
    /// Every dial fails while set.
    fail_always: bool,
    /// `close` reports an error while set.
    fail_close: bool,
    /// `close` never completes while set.
    stall_close: bool,
    /// Sent frames are looped back as inbound frames.
    echo: bool,
    /// Frames queued on every new connection.
    greeting: Vec<Frame>,
    /// URL of every dial, successful or not.
    dialed: Vec<Url>,
    /// Remote ends of successful dials, in order.
    peers: Vec<MemoryPeer>,
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Connector producing in-process connections.
///
/// Cloning shares the script and history.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MemoryConnector {
    /// Creates a connector whose dials always succeed.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector whose connections echo every sent frame.
    #[must_use]
    pub fn echo() -> Self {
        let connector = Self::new();
        connector.state.lock().echo = true;
        connector
    }

    /// Queues `frame` as inbound on every connection this connector opens.
    #[must_use]
    pub fn with_greeting(self, frame: impl Into<Frame>) -> Self {
        self.state.lock().greeting.push(frame.into());
        self
    }

    /// Makes the next `count` dials fail.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().fail_remaining = count;
    }

    /// Makes every dial fail until [`succeed`](Self::succeed) is called.
    pub fn fail_always(&self) {
        self.state.lock().fail_always = true;
    }

    /// Clears any scripted dial failures.
    pub fn succeed(&self) {
        let mut state = self.state.lock();
        state.fail_remaining = 0;
        state.fail_always = false;
    }

    /// Makes `close` on new connections report an error.
    ///
    /// The connection is still closed.
    pub fn fail_close(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    /// Makes `close` on new connections hang after marking them closed.
    pub fn stall_close(&self, stall: bool) {
        self.state.lock().stall_close = stall;
    }

    /// Returns the number of dials attempted.
    #[inline]
    #[must_use]
    pub fn dial_count(&self) -> usize {
        self.state.lock().dialed.len()
    }

    /// Returns the URL of every dial attempted.
    #[must_use]
    pub fn dialed(&self) -> Vec<Url> {
        self.state.lock().dialed.clone()
    }

    /// Returns the remote end of the `index`-th successful dial.
    #[must_use]
    pub fn peer(&self, index: usize) -> Option<MemoryPeer> {
        self.state.lock().peers.get(index).cloned()
    }

    /// Returns the remote end of the latest successful dial.
    #[must_use]
    pub fn last_peer(&self) -> Option<MemoryPeer> {
        self.state.lock().peers.last().cloned()
    }

    /// Returns the number of successful dials.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.lock().peers.len()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn dial(&self, url: &Url) -> Result<Arc<dyn Transport>> {
        let mut state = self.state.lock();
        state.dialed.push(url.clone());
        let attempt = state.dialed.len();

        if state.fail_always {
            return Err(Error::transport(format!("dial {attempt} to {url} refused")));
        }
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(Error::transport(format!("dial {attempt} to {url} refused")));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(watch::Sender::new(false));

        for frame in &state.greeting {
            let _ = inbound_tx.send(frame.clone());
        }

        let peer = MemoryPeer {
            inbound_tx: inbound_tx.clone(),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        state.peers.push(peer);

        trace!(%url, attempt, "Memory connection opened");

        Ok(Arc::new(MemoryTransport {
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            sent,
            closed,
            echo: state.echo,
            fail_close: state.fail_close,
            stall_close: state.stall_close,
        }))
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Remote end of an in-process connection.
#[derive(Clone)]
pub struct MemoryPeer {
    inbound_tx: mpsc::UnboundedSender<Frame>,
    sent: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<watch::Sender<bool>>,
}

impl MemoryPeer {
    /// Delivers `frame` to the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed.
    pub fn push(&self, frame: impl Into<Frame>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.inbound_tx
            .send(frame.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns every frame the client sent on this connection.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Closes the connection from the remote side.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Returns `true` once either side closed the connection.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Client end of an in-process connection.
pub struct MemoryTransport {
    /// Loops sent frames back in echo mode.
    inbound_tx: mpsc::UnboundedSender<Frame>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<Frame>>,
    sent: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<watch::Sender<bool>>,
    echo: bool,
    fail_close: bool,
    stall_close: bool,
}

impl MemoryTransport {
    /// Returns `true` once either side closed the connection.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        self.sent.lock().push(frame.clone());
        if self.echo {
            let _ = self.inbound_tx.send(frame);
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Frame> {
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(Error::ConnectionClosed),
            frame = async { self.inbound_rx.lock().await.recv().await } => {
                frame.ok_or(Error::ConnectionClosed)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);

        if self.stall_close {
            std::future::pending::<()>().await;
        }
        if self.fail_close {
            return Err(Error::transport("close handshake failed"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
