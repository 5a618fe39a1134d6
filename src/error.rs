//! Error types for the WebSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use websocket_client::{Client, Result};
//!
//! async fn example(client: &mut Client) -> Result<()> {
//!     client.connect("ws://127.0.0.1:9001", 3, Duration::from_secs(2), false).await?;
//!     client.send(&serde_json::json!({ "message": "hello" })).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Endpoint | [`Error::InvalidEndpoint`] |
//! | Lifecycle | [`Error::AlreadyConnected`], [`Error::DialExhausted`] |
//! | Encoding | [`Error::Encode`] |
//! | Transport | [`Error::NotConnected`], [`Error::ConnectionClosed`], [`Error::CloseTimeout`], [`Error::Transport`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Endpoint Errors
    // ========================================================================
    /// Endpoint URL could not be parsed or has a non-WebSocket scheme.
    ///
    /// Never retried.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint string as given by the caller.
        endpoint: String,
        /// Why the endpoint was rejected.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Connect called on a client that already holds a live connection.
    #[error("Client is already connected")]
    AlreadyConnected,

    /// Every dial attempt failed.
    ///
    /// Wraps the error from the final attempt, if any attempt was made.
    #[error("Dial failed after {attempts} attempt(s)")]
    DialExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        #[source]
        last_error: Option<Box<Error>>,
    },

    // ========================================================================
    // Encoding Errors
    // ========================================================================
    /// Payload could not be serialized.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// No connection is currently established.
    #[error("Not connected")]
    NotConnected,

    /// Connection was closed, locally or by the remote end.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Close handshake did not finish in time.
    ///
    /// The underlying socket is released regardless.
    #[error("Close handshake timed out after {timeout_ms}ms")]
    CloseTimeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Transport-specific failure.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a dial exhausted error.
    #[inline]
    pub fn dial_exhausted(attempts: u32, last_error: Option<Error>) -> Self {
        Self::DialExhausted {
            attempts,
            last_error: last_error.map(Box::new),
        }
    }

    /// Creates a close timeout error.
    #[inline]
    pub fn close_timeout(timeout_ms: u64) -> Self {
        Self::CloseTimeout { timeout_ms }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from the send/receive path.
    ///
    /// Covers both a missing connection and a failed write.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionClosed
                | Self::CloseTimeout { .. }
                | Self::Transport { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error means no connection could be used.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::DialExhausted { .. } | Self::NotConnected | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when the caller connects again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DialExhausted { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::Io(_)
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
