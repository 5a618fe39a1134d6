//! Text and binary frames.
//!
//! [`Frame::json`] is the encoder used by `send`: any [`Serialize`] value
//! becomes a single text frame.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;

// ============================================================================
// Frame
// ============================================================================

/// A complete WebSocket data frame.
///
/// Control frames (ping, pong, close) never surface as a `Frame`; the
/// transport handles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Encodes `value` as JSON into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`](crate::Error::Encode) if the value cannot be
    /// serialized (e.g. a map with non-string keys).
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::Text(serde_json::to_string(value)?))
    }

    /// Returns the payload bytes regardless of frame kind.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Returns the text payload, or `None` for binary frames.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Consumes the frame and returns its payload bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use serde_json::json;

    use crate::error::Error;

    #[test]
    fn test_json_encodes_text_frame() {
        let mut data = HashMap::new();
        data.insert("message", "Hello WebSocket");

        let frame = Frame::json(&data).expect("encode");
        assert_eq!(frame, Frame::Text(r#"{"message":"Hello WebSocket"}"#.to_string()));
    }

    #[test]
    fn test_json_rejects_non_string_keys() {
        let mut data = HashMap::new();
        data.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = Frame::json(&data).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }

    #[test]
    fn test_payload_accessors() {
        let text = Frame::from("abc");
        assert_eq!(text.as_bytes(), b"abc");
        assert_eq!(text.as_text(), Some("abc"));
        assert_eq!(text.len(), 3);

        let binary = Frame::from(vec![0u8, 1, 2]);
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.into_bytes(), vec![0, 1, 2]);
        assert!(Frame::Binary(Vec::new()).is_empty());
    }

    #[test]
    fn test_into_message() {
        let message: Message = Frame::json(&json!({ "a": 1 })).expect("encode").into();
        assert!(matches!(message, Message::Text(ref t) if t.as_str() == r#"{"a":1}"#));

        let message: Message = Frame::Binary(vec![7]).into();
        assert!(matches!(message, Message::Binary(ref b) if b[..] == [7u8]));
    }
}
