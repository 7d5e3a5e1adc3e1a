//! Room membership for conversation and personal rooms.
//!
//! Rooms are lazily created: an entry exists while at least one connection
//! is a member and is removed when the last member leaves. Personal rooms
//! are ordinary rooms named exactly by an identity; conversation rooms use
//! the canonical pairwise key from [`chatpulse_proto::room`].

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::registry::ConnId;

/// Membership map from room id to the set of joined connections.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, HashSet<ConnId>>>,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomManager {
    /// Creates an empty room manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection to a room. Idempotent set membership; the join is
    /// visible to the very next broadcast targeting the room.
    pub async fn join(&self, conn_id: ConnId, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id.to_string()).or_default().insert(conn_id);
    }

    /// Removes a connection from a room, dropping the room when it empties.
    pub async fn leave(&self, conn_id: ConnId, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Removes a connection from every room it joined. Called once, on
    /// terminal disconnect.
    pub async fn leave_all(&self, conn_id: ConnId) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Returns the current members of a room.
    pub async fn members(&self, room_id: &str) -> Vec<ConnId> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns whether any connection outside `excluding` is a member.
    ///
    /// This occupancy check is approximate by design: membership says the
    /// receiver has the conversation joined somewhere, not that the app is
    /// foregrounded. Callers must not conflate the two.
    pub async fn occupied_excluding(&self, room_id: &str, excluding: &HashSet<ConnId>) -> bool {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .is_some_and(|members| members.iter().any(|conn| !excluding.contains(conn)))
    }
}
