//! Connection registry: maps user identities to live connections.
//!
//! Every accepted WebSocket gets a process-unique [`ConnId`] and an
//! outbound frame channel. An identity is attached later, on the client's
//! `Init` event, and one identity may own several simultaneous connections
//! (multiple devices or tabs). Both directions of the mapping live behind a
//! single lock so attach/detach stay atomic.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use chatpulse_proto::room;
use tokio::sync::{RwLock, mpsc};

/// Process-unique handle for one live connection.
pub type ConnId = u64;

/// Outcome of attaching an identity to a connection.
#[derive(Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The identity was recorded on the connection.
    Attached {
        /// The trimmed identity now bound to the connection.
        identity: String,
        /// The identity the connection was previously bound to, when the
        /// attach re-bound it (last writer wins).
        previous: Option<String>,
    },
    /// The identity was empty or malformed; nothing changed.
    Rejected,
}

/// Outcome of detaching a connection on terminal disconnect.
#[derive(Debug, PartialEq, Eq)]
pub struct Detached {
    /// The identity that was attached, if any.
    pub identity: Option<String>,
    /// Whether this was the identity's last live connection.
    pub was_last: bool,
}

struct ConnEntry {
    sender: mpsc::UnboundedSender<Message>,
    identity: Option<String>,
}

#[derive(Default)]
struct Inner {
    conns: HashMap<ConnId, ConnEntry>,
    by_identity: HashMap<String, HashSet<ConnId>>,
}

/// Registry of live connections and their identities.
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a freshly accepted connection, returning its handle.
    ///
    /// The connection has no identity until [`Self::attach`] is called.
    pub async fn insert(&self, sender: mpsc::UnboundedSender<Message>) -> ConnId {
        let conn_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        inner.conns.insert(
            conn_id,
            ConnEntry {
                sender,
                identity: None,
            },
        );
        conn_id
    }

    /// Records an identity on a connection.
    ///
    /// The identity is trimmed first; an empty or malformed identity is
    /// rejected as a no-op. Attaching the same identity twice is idempotent.
    /// Attaching a different identity re-binds the connection (last writer
    /// wins) and reports the previous identity so the caller can leave its
    /// personal room.
    pub async fn attach(&self, conn_id: ConnId, raw_identity: &str) -> AttachOutcome {
        let Ok(identity) = room::trimmed_identity(raw_identity) else {
            return AttachOutcome::Rejected;
        };
        let identity = identity.to_string();

        let mut inner = self.inner.write().await;
        let Some(entry) = inner.conns.get_mut(&conn_id) else {
            return AttachOutcome::Rejected;
        };

        let previous = match entry.identity.replace(identity.clone()) {
            Some(old) if old == identity => None,
            other => other,
        };

        if let Some(old) = &previous
            && let Some(set) = inner.by_identity.get_mut(old)
        {
            set.remove(&conn_id);
            if set.is_empty() {
                inner.by_identity.remove(old);
            }
        }

        inner
            .by_identity
            .entry(identity.clone())
            .or_default()
            .insert(conn_id);

        AttachOutcome::Attached { identity, previous }
    }

    /// Removes a connection on terminal disconnect.
    ///
    /// Reports the identity that was attached and whether it was the
    /// identity's last live connection, so the presence tracker can react.
    pub async fn detach(&self, conn_id: ConnId) -> Detached {
        let mut inner = self.inner.write().await;
        let identity = inner
            .conns
            .remove(&conn_id)
            .and_then(|entry| entry.identity);

        let was_last = if let Some(id) = &identity
            && let Some(set) = inner.by_identity.get_mut(id)
        {
            set.remove(&conn_id);
            if set.is_empty() {
                inner.by_identity.remove(id);
                true
            } else {
                false
            }
        } else {
            false
        };

        Detached { identity, was_last }
    }

    /// Returns a clone of the outbound channel for a connection.
    pub async fn sender(&self, conn_id: ConnId) -> Option<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        inner.conns.get(&conn_id).map(|e| e.sender.clone())
    }

    /// Returns the outbound channels of every live connection.
    ///
    /// Used for global broadcasts; presence is the only notification with
    /// this audience.
    pub async fn all_senders(&self) -> Vec<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        inner.conns.values().map(|e| e.sender.clone()).collect()
    }

    /// Returns the connection handles currently bound to an identity.
    pub async fn connections_for(&self, identity: &str) -> HashSet<ConnId> {
        let inner = self.inner.read().await;
        inner
            .by_identity
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }
}
