//! Frame types exchanged with the remote end.
//!
//! The client does not interpret payloads. Frames are either UTF-8 text or
//! raw bytes, and JSON encoding of outbound values happens here so the
//! transport layer only ever sees finished frames.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | [`Frame`] and the JSON encoder |

// ============================================================================
// Submodules
// ============================================================================

/// Text/binary frames and JSON encoding.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::Frame;
