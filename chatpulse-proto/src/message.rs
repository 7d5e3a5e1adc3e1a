//! Message envelope and delivery lifecycle types.
//!
//! An [`Envelope`] is the unit of exchange between two chat participants.
//! The hub never stores envelopes; it only relays them and advances their
//! [`DeliveryStatus`] through the forward-only lifecycle
//! `Sent -> Delivered -> Seen`.

use serde::{Deserialize, Serialize};

/// Maximum allowed message body size in bytes (64 KB).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Delivery lifecycle stage of a message.
///
/// The variants form a total order (`Sent < Delivered < Seen`); the hub
/// only ever moves a message's status forward along that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DeliveryStatus {
    /// Accepted by the hub and relayed to the conversation room.
    Sent,
    /// Receipt confirmed by the receiver's client.
    Delivered,
    /// Receiver has the conversation in view.
    Seen,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Delivered => write!(f, "delivered"),
            Self::Seen => write!(f, "seen"),
        }
    }
}

/// A message in flight between two participants.
///
/// `id` is assigned by the sending client and is opaque to the hub; it is
/// only guaranteed unique per sender. The hub relays envelopes and status
/// transitions keyed by `id` plus the `(sender, receiver)` pair — it never
/// persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Client-assigned message identifier, unique per sender.
    pub id: String,
    /// Identity of the sending participant.
    pub sender: String,
    /// Identity of the receiving participant.
    pub receiver: String,
    /// Message body text.
    pub body: String,
    /// Client-side creation time.
    pub timestamp: Timestamp,
    /// Current delivery lifecycle stage.
    pub status: DeliveryStatus,
}

/// Error returned when an envelope fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Message body exceeds the maximum allowed size.
    #[error("message body too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

impl Envelope {
    /// Validates this envelope for relaying.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooLarge`] if the body exceeds
    /// [`MAX_BODY_BYTES`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let size = self.body.len();
        if size > MAX_BODY_BYTES {
            return Err(ValidationError::TooLarge {
                size,
                max: MAX_BODY_BYTES,
            });
        }
        Ok(())
    }
}
