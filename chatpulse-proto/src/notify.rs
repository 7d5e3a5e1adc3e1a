//! Outbound notifications emitted by the hub.
//!
//! Audience targeting is part of each variant's contract: presence changes
//! are the only globally broadcast notification; everything else is scoped
//! to a conversation room, a personal room, or a single connection.

use serde::{Deserialize, Serialize};

use crate::message::{DeliveryStatus, Envelope};
use crate::presence::PresenceUpdate;

/// Notifications the hub pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A user's presence changed. Broadcast to **all** connected clients.
    PresenceChanged(PresenceUpdate),

    /// A message envelope relayed to the conversation room.
    Message(Envelope),

    /// The receiver was not joined to the conversation room at send time;
    /// delivered to the receiver's personal room so their UI can surface
    /// the message outside an open chat view.
    BackgroundAlert(Envelope),

    /// The hub accepted a message. Sent to the originating connection only;
    /// not a guarantee of receiver delivery.
    SendAck {
        /// Identifier of the accepted message.
        id: String,
        /// Identity of the receiver.
        receiver: String,
        /// Always [`DeliveryStatus::Sent`].
        status: DeliveryStatus,
    },

    /// A message advanced to delivered. Sent to the sender's personal room
    /// only — the receiver already knows it delivered.
    DeliveryUpdated {
        /// Identifier of the delivered message.
        id: String,
        /// Identity of the original sender.
        sender: String,
        /// Identity of the receiver.
        receiver: String,
        /// Always [`DeliveryStatus::Delivered`].
        status: DeliveryStatus,
    },

    /// The opener has the conversation in view; all of the partner's prior
    /// messages to the opener are seen. Broadcast to the conversation room.
    SeenUpdated {
        /// The participant now viewing the conversation.
        opener: String,
        /// The counterpart whose messages were seen.
        partner: String,
        /// Always [`DeliveryStatus::Seen`].
        status: DeliveryStatus,
    },
}
