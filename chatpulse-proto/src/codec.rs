//! Serialization for the `ChatPulse` wire format.
//!
//! Client events and hub notifications are postcard-encoded and carried in
//! WebSocket binary frames; the transport preserves message boundaries, so
//! no framing layer is needed here.

use crate::event::ClientEvent;
use crate::notify::Notification;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`ClientEvent`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the event cannot be serialized.
pub fn encode_event(event: &ClientEvent) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(event).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`ClientEvent`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the bytes cannot be deserialized.
pub fn decode_event(bytes: &[u8]) -> Result<ClientEvent, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a [`Notification`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the notification cannot be
/// serialized.
pub fn encode_notification(note: &Notification) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(note).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`Notification`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the bytes cannot be deserialized.
pub fn decode_notification(bytes: &[u8]) -> Result<Notification, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
