//! Builder pattern for client configuration.
//!
//! Callbacks are bound here once and cannot be changed afterwards.
//!
//! # Example
//!
//! ```no_run
//! use websocket_client::Client;
//!
//! let client = Client::builder()
//!     .on_open(|_, reconnecting| println!("open (reconnecting: {reconnecting})"))
//!     .on_close(|_, reconnecting| println!("closed (reconnecting: {reconnecting})"))
//!     .on_message(|_, frame| println!("received {} bytes", frame.len()))
//!     .build();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::protocol::Frame;
use crate::transport::{Connector, WebSocketConnector};

use super::core::{Client, ClientHandle};

// ============================================================================
// Types
// ============================================================================

/// Open/close callback.
///
/// Receives the client handle and whether the transition is part of a
/// reconnect.
pub type LifecycleHandler = Arc<dyn Fn(&ClientHandle, bool) + Send + Sync>;

/// Message callback.
///
/// Runs on the receive loop task, once per inbound frame, in order.
pub type MessageHandler = Arc<dyn Fn(&ClientHandle, Frame) + Send + Sync>;

// ============================================================================
// Callbacks
// ============================================================================

/// The callbacks bound to a client.
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
    pub(crate) on_open: Option<LifecycleHandler>,
    pub(crate) on_close: Option<LifecycleHandler>,
    pub(crate) on_message: Option<MessageHandler>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default)]
pub struct ClientBuilder {
    /// Callbacks to bind.
    callbacks: Callbacks,
    /// Connector override; defaults to [`WebSocketConnector`].
    connector: Option<Arc<dyn Connector>>,
}

impl ClientBuilder {
    /// Creates a new builder with no callbacks and the WebSocket connector.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the callback fired after each successful connect.
    #[must_use]
    pub fn on_open<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientHandle, bool) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(handler));
        self
    }

    /// Sets the callback fired after each disconnect, once the receive loop
    /// has exited.
    #[must_use]
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientHandle, bool) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(handler));
        self
    }

    /// Sets the callback fired for each inbound frame.
    #[must_use]
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientHandle, Frame) + Send + Sync + 'static,
    {
        self.callbacks.on_message = Some(Arc::new(handler));
        self
    }

    /// Sets the connector used to dial endpoints.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client. It starts disconnected.
    #[must_use]
    pub fn build(self) -> Client {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new()));

        Client::new(connector, self.callbacks)
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("callbacks", &self.callbacks)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
