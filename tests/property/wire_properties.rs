//! Property-based tests for room-key derivation and wire codecs.
//!
//! Uses proptest to verify:
//! 1. `conversation_key` is order-independent for any valid identity pair.
//! 2. `conversation_key` is invariant under leading/trailing whitespace.
//! 3. Any valid `ClientEvent` survives an encode -> decode round-trip.
//! 4. Any valid `Notification` survives an encode -> decode round-trip.
//! 5. Random bytes never cause a panic in decoding (graceful `Err`).

use proptest::prelude::*;

use chatpulse_proto::codec;
use chatpulse_proto::event::ClientEvent;
use chatpulse_proto::message::{DeliveryStatus, Envelope, Timestamp};
use chatpulse_proto::notify::Notification;
use chatpulse_proto::presence::{PresenceState, PresenceUpdate};
use chatpulse_proto::room::{self, ROOM_DELIMITER};

// --- Strategies for protocol values ---

/// Strategy for valid identities: non-empty, no delimiter, no edge
/// whitespace.
fn arb_identity() -> impl Strategy<Value = String> {
    "[A-Za-z0-9.@-]{1,16}"
}

/// Strategy for whitespace padding around an identity.
fn arb_padding() -> impl Strategy<Value = String> {
    "[ \t]{0,4}"
}

/// Strategy for arbitrary `Timestamp` values.
fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    any::<u64>().prop_map(Timestamp::from_millis)
}

/// Strategy for arbitrary `DeliveryStatus` values.
fn arb_status() -> impl Strategy<Value = DeliveryStatus> {
    prop_oneof![
        Just(DeliveryStatus::Sent),
        Just(DeliveryStatus::Delivered),
        Just(DeliveryStatus::Seen),
    ]
}

/// Strategy for arbitrary `Envelope` values.
fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        "[a-z0-9-]{1,12}",
        arb_identity(),
        arb_identity(),
        "[^\x00]{0,256}",
        arb_timestamp(),
        arb_status(),
    )
        .prop_map(|(id, sender, receiver, body, timestamp, status)| Envelope {
            id,
            sender,
            receiver,
            body,
            timestamp,
            status,
        })
}

/// Strategy for arbitrary `ClientEvent` values.
fn arb_event() -> impl Strategy<Value = ClientEvent> {
    prop_oneof![
        arb_identity().prop_map(|identity| ClientEvent::Init { identity }),
        arb_identity().prop_map(|identity| ClientEvent::UserActive { identity }),
        arb_identity().prop_map(|identity| ClientEvent::UserInactive { identity }),
        (arb_identity(), arb_identity())
            .prop_map(|(user_a, user_b)| ClientEvent::JoinConversation { user_a, user_b }),
        arb_envelope().prop_map(|e| ClientEvent::SendMessage {
            id: e.id,
            sender: e.sender,
            receiver: e.receiver,
            body: e.body,
            timestamp: e.timestamp,
        }),
        ("[a-z0-9-]{1,12}", arb_identity(), arb_identity()).prop_map(
            |(id, sender, receiver)| ClientEvent::MessageDelivered { id, sender, receiver }
        ),
        (arb_identity(), arb_identity())
            .prop_map(|(opener, partner)| ClientEvent::ChatOpened { opener, partner }),
    ]
}

/// Strategy for arbitrary `Notification` values.
fn arb_notification() -> impl Strategy<Value = Notification> {
    prop_oneof![
        (arb_identity(), any::<bool>(), proptest::option::of(arb_timestamp())).prop_map(
            |(user, online, last_seen)| {
                Notification::PresenceChanged(PresenceUpdate {
                    user,
                    state: if online {
                        PresenceState::Online
                    } else {
                        PresenceState::Offline
                    },
                    last_seen,
                })
            }
        ),
        arb_envelope().prop_map(Notification::Message),
        arb_envelope().prop_map(Notification::BackgroundAlert),
        ("[a-z0-9-]{1,12}", arb_identity()).prop_map(|(id, receiver)| Notification::SendAck {
            id,
            receiver,
            status: DeliveryStatus::Sent,
        }),
        ("[a-z0-9-]{1,12}", arb_identity(), arb_identity()).prop_map(
            |(id, sender, receiver)| Notification::DeliveryUpdated {
                id,
                sender,
                receiver,
                status: DeliveryStatus::Delivered,
            }
        ),
        (arb_identity(), arb_identity()).prop_map(|(opener, partner)| {
            Notification::SeenUpdated {
                opener,
                partner,
                status: DeliveryStatus::Seen,
            }
        }),
    ]
}

// --- Property tests ---

proptest! {
    /// The conversation key never depends on argument order.
    #[test]
    fn conversation_key_is_symmetric(a in arb_identity(), b in arb_identity()) {
        prop_assert_eq!(
            room::conversation_key(&a, &b).expect("valid identities"),
            room::conversation_key(&b, &a).expect("valid identities")
        );
    }

    /// Leading/trailing whitespace never changes the key.
    #[test]
    fn conversation_key_is_trim_invariant(
        a in arb_identity(),
        b in arb_identity(),
        pad_l in arb_padding(),
        pad_r in arb_padding(),
    ) {
        let padded = format!("{pad_l}{a}{pad_r}");
        prop_assert_eq!(
            room::conversation_key(&padded, &b).expect("valid identities"),
            room::conversation_key(&a, &b).expect("valid identities")
        );
    }

    /// The key is the two sorted identities joined by the delimiter.
    #[test]
    fn conversation_key_shape(a in arb_identity(), b in arb_identity()) {
        let key = room::conversation_key(&a, &b).expect("valid identities");
        let (first, second) = if a <= b { (&a, &b) } else { (&b, &a) };
        prop_assert_eq!(key, format!("{first}{ROOM_DELIMITER}{second}"));
    }

    /// Any valid client event survives encode -> decode.
    #[test]
    fn client_event_round_trip(event in arb_event()) {
        let bytes = codec::encode_event(&event).expect("encode should succeed");
        let decoded = codec::decode_event(&bytes).expect("decode should succeed");
        prop_assert_eq!(event, decoded);
    }

    /// Any valid notification survives encode -> decode.
    #[test]
    fn notification_round_trip(note in arb_notification()) {
        let bytes = codec::encode_notification(&note).expect("encode should succeed");
        let decoded = codec::decode_notification(&bytes).expect("decode should succeed");
        prop_assert_eq!(note, decoded);
    }

    /// Random bytes never panic the decoders; they return Err gracefully.
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_event(&bytes);
        let _ = codec::decode_notification(&bytes);
    }
}
