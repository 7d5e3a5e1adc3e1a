//! Delivery ledger: per-message forward-only status state machine.
//!
//! Tracks each in-flight message's progression `Sent -> Delivered -> Seen`.
//! Messages are keyed by `(sender, id)` since ids are only unique per
//! sender. Repeated or backward signals are idempotent no-ops reported as
//! [`Transition::Stale`] — never errors. A `Delivered` signal for an id the
//! ledger has never seen is also stale, which is how out-of-order delivery
//! of `delivered` before `sent` is tolerated.
//!
//! Seen is conversation-level: opening a chat advances every tracked
//! message from the partner to the opener in one coalesced pass. Seen is
//! terminal, so those entries are dropped, which bounds ledger growth.

use std::collections::HashMap;

use chatpulse_proto::message::DeliveryStatus;
use tokio::sync::RwLock;

/// Result of applying a status signal to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The message moved forward to the given status.
    Advanced(DeliveryStatus),
    /// The signal was equal to or behind the tracked status; nothing
    /// changed and nothing should be fanned out.
    Stale,
}

#[derive(Debug)]
struct Tracked {
    receiver: String,
    status: DeliveryStatus,
}

/// In-memory ledger of in-flight message statuses.
pub struct DeliveryLedger {
    messages: RwLock<HashMap<(String, String), Tracked>>,
}

impl Default for DeliveryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
        }
    }

    /// Records a freshly submitted message at [`DeliveryStatus::Sent`].
    ///
    /// A duplicate send of an id the ledger already tracks is stale; the
    /// caller drops the whole event so an existing status never regresses.
    pub async fn record_sent(&self, sender: &str, id: &str, receiver: &str) -> Transition {
        let mut messages = self.messages.write().await;
        let key = (sender.to_string(), id.to_string());
        if messages.contains_key(&key) {
            return Transition::Stale;
        }
        messages.insert(
            key,
            Tracked {
                receiver: receiver.to_string(),
                status: DeliveryStatus::Sent,
            },
        );
        Transition::Advanced(DeliveryStatus::Sent)
    }

    /// Advances a message to [`DeliveryStatus::Delivered`].
    ///
    /// Stale when the message is untracked or already at delivered or
    /// beyond.
    pub async fn mark_delivered(&self, sender: &str, id: &str) -> Transition {
        let mut messages = self.messages.write().await;
        let key = (sender.to_string(), id.to_string());
        match messages.get_mut(&key) {
            Some(tracked) if tracked.status < DeliveryStatus::Delivered => {
                tracked.status = DeliveryStatus::Delivered;
                Transition::Advanced(DeliveryStatus::Delivered)
            }
            _ => Transition::Stale,
        }
    }

    /// Marks every tracked message from `partner` to `opener` as seen and
    /// drops it, returning how many messages advanced.
    pub async fn mark_conversation_seen(&self, partner: &str, opener: &str) -> usize {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|(sender, _), tracked| {
            !(sender == partner && tracked.receiver == opener)
        });
        before - messages.len()
    }

    /// Returns the tracked status of a message, if any.
    pub async fn status_of(&self, sender: &str, id: &str) -> Option<DeliveryStatus> {
        let messages = self.messages.read().await;
        messages
            .get(&(sender.to_string(), id.to_string()))
            .map(|tracked| tracked.status)
    }
}
