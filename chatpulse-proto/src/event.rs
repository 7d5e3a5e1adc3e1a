//! Inbound client events consumed by the hub coordinator.

use serde::{Deserialize, Serialize};

use crate::message::Timestamp;

/// Events a client sends to the hub over its WebSocket connection.
///
/// Malformed events (empty identities, unknown message ids for stale
/// transitions) are dropped silently by the hub — there is no NACK channel
/// in this protocol. The only signal of failure a client gets is the
/// absence of an expected status progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Declares the connection's identity, joins the personal room, and
    /// transitions presence to online.
    Init {
        /// The identity this connection speaks for.
        identity: String,
    },

    /// Explicit "user active" signal; presence goes online.
    UserActive {
        /// The identity to mark online.
        identity: String,
    },

    /// Explicit "user inactive" signal; presence goes offline with
    /// `last_seen` stamped by the hub.
    UserInactive {
        /// The identity to mark offline.
        identity: String,
    },

    /// Joins this connection to the canonical conversation room for the
    /// given pair of participants.
    JoinConversation {
        /// One participant.
        user_a: String,
        /// The other participant.
        user_b: String,
    },

    /// Submits a message for relay to the conversation room.
    SendMessage {
        /// Client-assigned message identifier, unique per sender.
        id: String,
        /// Identity of the sender.
        sender: String,
        /// Identity of the receiver.
        receiver: String,
        /// Message body text.
        body: String,
        /// Client-side creation time.
        timestamp: Timestamp,
    },

    /// Receiver's client confirms receipt of a message.
    MessageDelivered {
        /// Identifier of the delivered message.
        id: String,
        /// Identity of the original sender.
        sender: String,
        /// Identity of the receiver confirming delivery.
        receiver: String,
    },

    /// Receiver's client has the conversation in view; marks all of the
    /// partner's prior messages to the opener as seen, in one coalesced
    /// signal.
    ChatOpened {
        /// The participant now viewing the conversation.
        opener: String,
        /// The counterpart whose messages are being seen.
        partner: String,
    },
}
