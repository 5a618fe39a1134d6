//! Transport layer.
//!
//! The client never touches sockets directly. It dials through a
//! [`Connector`] and talks to the resulting [`Transport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   dial(url)   ┌─────────────────┐
//! │     Client      │──────────────►│    Connector    │
//! │                 │               └────────┬────────┘
//! │  send ──────────┼──┐                     │ Arc<dyn Transport>
//! │  receive loop ◄─┼──┼─────────────────────┘
//! └─────────────────┘  │       ┌─────────────────┐
//!                      └──────►│    Transport    │◄────► remote end
//!                              └─────────────────┘
//! ```
//!
//! # Contract
//!
//! - `send` and `recv` may run concurrently from different tasks.
//! - `recv` must be cancel-safe; the receive loop races it against the
//!   cancellation signal.
//! - `close` must make any pending and future `recv` fail.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | `tokio-tungstenite` connector and transport |
//! | `memory` | In-process transport with scripted failures |
//! | `server` | Localhost WebSocket echo server |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::protocol::Frame;

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport.
pub mod memory;

/// Localhost WebSocket echo server.
pub mod server;

/// WebSocket transport over `tokio-tungstenite`.
pub mod websocket;

/// Misbehaving peers for tests.
#[cfg(test)]
pub(crate) mod fixtures;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryConnector, MemoryPeer, MemoryTransport};
pub use server::EchoServer;
pub use websocket::{DEFAULT_CLOSE_TIMEOUT, WebSocketConnector, WebSocketTransport};

// ============================================================================
// Traits
// ============================================================================

/// An established connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// after `close`, or the underlying write error.
    async fn send(&self, frame: Frame) -> Result<()>;

    /// Receives the next data frame.
    ///
    /// # Errors
    ///
    /// Returns an error once the connection is closed from either side or
    /// the network fails. The receive loop treats any error as the end of
    /// the connection.
    async fn recv(&self) -> Result<Frame>;

    /// Closes the connection.
    ///
    /// Pending `recv` calls return an error once this is called, even if
    /// the close handshake itself fails.
    async fn close(&self) -> Result<()>;
}

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Dials `url` once.
    ///
    /// Retrying is the caller's job.
    async fn dial(&self, url: &Url) -> Result<Arc<dyn Transport>>;
}
