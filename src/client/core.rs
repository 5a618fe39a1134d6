//! Client lifecycle and send path.
//!
//! [`Client`] owns the connection: it dials with retry, starts and joins
//! the receive loop, and fires the lifecycle callbacks. [`ClientHandle`] is
//! the cheap, cloneable view passed to callbacks; it can send and inspect
//! the connection but cannot change its lifecycle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::transport::{Connector, Transport};

use super::builder::{Callbacks, ClientBuilder};
use super::receive::{self, CancelScope};
use super::retry::RetryPolicy;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the initial and post-disconnect state.
    Disconnected,
    /// Dial attempts in progress.
    Connecting,
    /// Connected with a running (or finished, after a remote close)
    /// receive loop.
    Connected,
}

// ============================================================================
// ClientHandle
// ============================================================================

/// State shared between the client, its handles and the receive loop.
struct Shared {
    /// Present exactly while the client is connected.
    transport: RwLock<Option<Arc<dyn Transport>>>,
    /// Number of running receive loops (0 or 1).
    inflight: Arc<AtomicUsize>,
}

/// Cloneable handle to a [`Client`].
///
/// Handed to every callback. Stays valid across reconnects and always
/// refers to the current connection.
#[derive(Clone)]
pub struct ClientHandle {
    shared: Arc<Shared>,
}

impl ClientHandle {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                transport: RwLock::new(None),
                inflight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Returns `true` while a connection is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.transport.read().is_some()
    }

    /// Returns the number of receive loops currently running.
    ///
    /// Never more than one.
    #[inline]
    #[must_use]
    pub fn active_receive_loops(&self) -> usize {
        self.shared.inflight.load(Ordering::SeqCst)
    }

    /// Encodes `payload` as JSON and sends it as a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Encode`] if `payload` cannot be serialized
    /// - [`Error::NotConnected`] if there is no connection
    /// - a transport error if the write fails
    pub async fn send<T>(&self, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let frame = Frame::json(payload)?;
        self.send_frame(frame).await
    }

    /// Sends a pre-built frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - a transport error if the write fails
    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        let transport = self.transport().ok_or(Error::NotConnected)?;
        transport.send(frame).await
    }

    /// Clones the current transport out of the slot.
    ///
    /// The lock is released before any I/O happens.
    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.shared.transport.read().clone()
    }

    fn set_transport(&self, transport: Arc<dyn Transport>) {
        *self.shared.transport.write() = Some(transport);
    }

    fn take_transport(&self) -> Option<Arc<dyn Transport>> {
        self.shared.transport.write().take()
    }

    pub(crate) fn inflight(&self) -> &Arc<AtomicUsize> {
        &self.shared.inflight
    }
}

// ============================================================================
// Client
// ============================================================================

/// A WebSocket client that can connect, disconnect and reconnect.
///
/// Lifecycle methods take `&mut self`, so they never overlap. Sending works
/// through `&self` or through any [`ClientHandle`], concurrently with the
/// receive loop.
///
/// # Dropping
///
/// Dropping a connected client aborts its receive loop and releases the
/// connection, but it is not a graceful disconnect: `on_close` does not
/// fire and no close frame is sent. Call [`disconnect`](Self::disconnect)
/// first for that.
pub struct Client {
    /// Dials endpoints.
    connector: Arc<dyn Connector>,
    /// Bound at construction, never replaced.
    callbacks: Callbacks,
    /// Shared with callbacks and the receive loop.
    handle: ClientHandle,
    /// Endpoint of the last successful connect.
    endpoint: Option<Url>,
    /// Scope of the current epoch's receive loop.
    scope: Option<CancelScope>,
    state: ConnectionState,
    /// Incremented on every successful connect.
    epoch: u64,
}

// ============================================================================
// Client - Constructor & Accessors
// ============================================================================

impl Client {
    /// Creates a builder for binding callbacks and a connector.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(connector: Arc<dyn Connector>, callbacks: Callbacks) -> Self {
        Self {
            connector,
            callbacks,
            handle: ClientHandle::new(),
            endpoint: None,
            scope: None,
            state: ConnectionState::Disconnected,
            epoch: 0,
        }
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` while connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Returns the endpoint of the last successful connect.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Returns the number of successful connects so far.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns a handle sharing this client's connection.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Returns the number of receive loops currently running.
    #[inline]
    #[must_use]
    pub fn active_receive_loops(&self) -> usize {
        self.handle.active_receive_loops()
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Connects to `endpoint`, dialing up to `attempts` times with
    /// `interval` between failures.
    ///
    /// On success `on_open(handle, is_reconnecting)` fires, then the
    /// receive loop starts.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] if `endpoint` is not a `ws`/`wss` URL
    /// - [`Error::AlreadyConnected`] if a connection is already established
    /// - [`Error::DialExhausted`] if every attempt failed (or `attempts` is 0)
    pub async fn connect(
        &mut self,
        endpoint: &str,
        attempts: u32,
        interval: Duration,
        is_reconnecting: bool,
    ) -> Result<()> {
        let policy = RetryPolicy::new(attempts, interval);
        self.connect_with(endpoint, &policy, is_reconnecting).await
    }

    /// Same as [`connect`](Self::connect) with the retry parameters given
    /// as a [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_with(
        &mut self,
        endpoint: &str,
        policy: &RetryPolicy,
        is_reconnecting: bool,
    ) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Err(Error::AlreadyConnected);
        }

        let url = parse_endpoint(endpoint)?;

        // Left behind by a disconnect that was dropped before it joined.
        if let Some(scope) = self.scope.take() {
            scope.retire().await;
        }

        self.state = ConnectionState::Connecting;
        debug!(endpoint = %url, attempts = policy.attempts, "Connecting");

        let connector = &self.connector;
        let target = &url;
        let dialed = policy
            .run(move |attempt| {
                trace!(endpoint = %target, attempt, "Dialing");
                connector.dial(target)
            })
            .await;

        let transport = match dialed {
            Ok(transport) => transport,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                return Err(e);
            }
        };

        self.epoch += 1;
        self.handle.set_transport(Arc::clone(&transport));
        self.state = ConnectionState::Connected;
        info!(endpoint = %url, epoch = self.epoch, is_reconnecting, "Connected");
        self.endpoint = Some(url);

        if let Some(on_open) = &self.callbacks.on_open {
            on_open(&self.handle, is_reconnecting);
        }

        self.scope = Some(receive::spawn(
            self.epoch,
            self.handle.clone(),
            transport,
            self.callbacks.on_message.clone(),
        ));

        Ok(())
    }

    /// Closes the connection and waits for the receive loop to exit, then
    /// fires `on_close(handle, is_reconnecting)`.
    ///
    /// Does nothing when not connected, so `on_close` fires once per
    /// connection. Close errors (including a timed out close handshake)
    /// are ignored.
    ///
    /// The client counts as disconnected as soon as this starts. If the
    /// returned future is dropped early, `on_close` does not fire and the
    /// receive loop is joined by the next connect.
    pub async fn disconnect(&mut self, is_reconnecting: bool) {
        if self.state != ConnectionState::Connected {
            trace!(state = ?self.state, "Disconnect ignored");
            return;
        }

        let transport = self.handle.take_transport();
        self.state = ConnectionState::Disconnected;

        if let Some(transport) = transport
            && let Err(e) = transport.close().await
        {
            debug!(epoch = self.epoch, error = %e, "Close failed, continuing shutdown");
        }

        if let Some(scope) = self.scope.take() {
            scope.retire().await;
        }

        info!(epoch = self.epoch, is_reconnecting, "Disconnected");

        if let Some(on_close) = &self.callbacks.on_close {
            on_close(&self.handle, is_reconnecting);
        }
    }

    /// Disconnects (as a reconnect) and connects again to `endpoint`.
    ///
    /// The previous receive loop has exited before the new connection is
    /// dialed.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect). On error the client is left
    /// disconnected.
    pub async fn reconnect(
        &mut self,
        endpoint: &str,
        attempts: u32,
        interval: Duration,
    ) -> Result<()> {
        let policy = RetryPolicy::new(attempts, interval);
        self.reconnect_with(endpoint, &policy).await
    }

    /// Same as [`reconnect`](Self::reconnect) with the retry parameters
    /// given as a [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn reconnect_with(&mut self, endpoint: &str, policy: &RetryPolicy) -> Result<()> {
        debug!(epoch = self.epoch, "Reconnecting");
        self.disconnect(true).await;
        self.connect_with(endpoint, policy, true).await
    }
}

// ============================================================================
// Client - Send
// ============================================================================

impl Client {
    /// Encodes `payload` as JSON and sends it as a text frame.
    ///
    /// A failed send leaves the connection as it is.
    ///
    /// # Errors
    ///
    /// - [`Error::Encode`] if `payload` cannot be serialized
    /// - [`Error::NotConnected`] if there is no connection
    /// - a transport error if the write fails
    pub async fn send<T>(&self, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.handle.send(payload).await
    }

    /// Sends a pre-built frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - a transport error if the write fails
    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        self.handle.send_frame(frame).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connected {
            debug!(epoch = self.epoch, "Client dropped while connected");
        }

        // Handles may outlive the client; the connection must not.
        self.handle.take_transport();
        // Aborts the receive loop.
        drop(self.scope.take());
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses and validates a WebSocket endpoint.
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| Error::invalid_endpoint(endpoint, e.to_string()))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(Error::invalid_endpoint(
            endpoint,
            format!("unsupported scheme '{scheme}', expected 'ws' or 'wss'"),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
