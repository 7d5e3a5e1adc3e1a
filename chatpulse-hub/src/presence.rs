//! Presence tracking: per-identity online/offline state and last-seen time.
//!
//! The tracker owns the state machine `unknown -> online -> offline -> ...`
//! and hands back the [`PresenceUpdate`] the coordinator broadcasts
//! globally. Whether a disconnect may flip an identity offline is decided
//! by the caller (only the identity's *last* connection does); the tracker
//! itself has no knowledge of connections.
//!
//! Records are never deleted. Identities that go offline and never return
//! are accepted memory growth.

use std::collections::HashMap;

use chatpulse_proto::message::Timestamp;
use chatpulse_proto::presence::{PresenceState, PresenceUpdate};
use tokio::sync::RwLock;

/// Per-identity presence record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    /// Current state.
    pub state: PresenceState,
    /// Offline-transition time; `None` while online.
    pub last_seen: Option<Timestamp>,
}

/// In-memory presence state for all identities this process has seen.
pub struct PresenceTracker {
    records: RwLock<HashMap<String, PresenceRecord>>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Marks an identity online, clearing its last-seen time.
    ///
    /// Returns the update to broadcast. Re-marking an already online
    /// identity returns an equivalent update; explicit "active" signals
    /// always re-broadcast.
    pub async fn mark_online(&self, identity: &str) -> PresenceUpdate {
        let mut records = self.records.write().await;
        records.insert(
            identity.to_string(),
            PresenceRecord {
                state: PresenceState::Online,
                last_seen: None,
            },
        );
        drop(records);

        PresenceUpdate {
            user: identity.to_string(),
            state: PresenceState::Online,
            last_seen: None,
        }
    }

    /// Marks an identity offline, stamping the hub's clock as last-seen.
    ///
    /// Returns the update to broadcast.
    pub async fn mark_offline(&self, identity: &str) -> PresenceUpdate {
        let last_seen = Some(Timestamp::now());
        let mut records = self.records.write().await;
        records.insert(
            identity.to_string(),
            PresenceRecord {
                state: PresenceState::Offline,
                last_seen,
            },
        );
        drop(records);

        PresenceUpdate {
            user: identity.to_string(),
            state: PresenceState::Offline,
            last_seen,
        }
    }

    /// Returns the current record for an identity, if one exists.
    pub async fn record(&self, identity: &str) -> Option<PresenceRecord> {
        let records = self.records.read().await;
        records.get(identity).cloned()
    }
}
