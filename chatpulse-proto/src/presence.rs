//! Presence status types for online/offline tracking.

use serde::{Deserialize, Serialize};

use crate::message::Timestamp;

/// Presence state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresenceState {
    /// At least one live connection, or an explicit "active" signal.
    Online,
    /// No live connections, or an explicit "inactive" signal.
    Offline,
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A presence change broadcast to every connected client.
///
/// `last_seen` is `None` while the user is online and carries the
/// offline-transition time otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// The user whose presence changed.
    pub user: String,
    /// The new presence state.
    pub state: PresenceState,
    /// When the user was last seen, if offline.
    pub last_seen: Option<Timestamp>,
}
