//! End-to-end WebSocket tests for the hub's presence and delivery flows.
//!
//! Each test starts a real hub on an OS-assigned port and drives it with
//! tokio-tungstenite clients, verifying audience targeting: who receives a
//! notification matters as much as its contents.

use std::time::Duration;

use chatpulse_hub::hub;
use chatpulse_proto::codec;
use chatpulse_proto::event::ClientEvent;
use chatpulse_proto::message::{DeliveryStatus, Timestamp};
use chatpulse_proto::notify::Notification;
use chatpulse_proto::presence::PresenceState;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start_hub() -> std::net::SocketAddr {
    let (addr, _handle) = hub::start_server("127.0.0.1:0")
        .await
        .expect("failed to start hub");
    addr
}

async fn send_event(ws: &mut Ws, event: &ClientEvent) {
    let bytes = codec::encode_event(event).expect("event should encode");
    ws.send(tungstenite::Message::Binary(bytes.into()))
        .await
        .expect("send should succeed");
}

/// Receives the next notification, failing the test after five seconds.
async fn recv_note(ws: &mut Ws) -> Notification {
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let tungstenite::Message::Binary(data) = msg {
                return codec::decode_notification(&data).expect("notification should decode");
            }
        }
        panic!("connection closed while awaiting notification");
    });
    deadline.await.expect("timed out awaiting notification")
}

/// Asserts that nothing arrives on the socket within a short window.
async fn assert_silent(ws: &mut Ws) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}

/// Connects a client, declares its identity, and waits for its own
/// presence-online broadcast as the sync point.
async fn connect_and_init(addr: std::net::SocketAddr, identity: &str) -> Ws {
    let url = format!("ws://{addr}/ws");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("connect should succeed");

    send_event(
        &mut ws,
        &ClientEvent::Init {
            identity: identity.to_string(),
        },
    )
    .await;

    let note = recv_note(&mut ws).await;
    let Notification::PresenceChanged(update) = note else {
        panic!("expected own presence broadcast, got {note:?}");
    };
    assert_eq!(update.user, identity);
    assert_eq!(update.state, PresenceState::Online);

    ws
}

/// Expects a presence notification for the given user and state.
async fn expect_presence(ws: &mut Ws, user: &str, state: PresenceState) {
    let note = recv_note(ws).await;
    let Notification::PresenceChanged(update) = note else {
        panic!("expected PresenceChanged, got {note:?}");
    };
    assert_eq!(update.user, user);
    assert_eq!(update.state, state);
}

#[tokio::test]
async fn full_delivery_lifecycle() {
    let addr = start_hub().await;

    let mut alice = connect_and_init(addr, "alice").await;
    let mut bob = connect_and_init(addr, "bob").await;
    // Bob's init was broadcast globally; alice sees it too.
    expect_presence(&mut alice, "bob", PresenceState::Online).await;

    // Alice sends with bob not joined to the conversation room.
    send_event(
        &mut alice,
        &ClientEvent::SendMessage {
            id: "m1".into(),
            sender: "alice".into(),
            receiver: "bob".into(),
            body: "hi".into(),
            timestamp: Timestamp::now(),
        },
    )
    .await;

    // Alice's sole feedback is the ack on her own connection.
    let note = recv_note(&mut alice).await;
    let Notification::SendAck { id, receiver, status } = note else {
        panic!("expected SendAck, got {note:?}");
    };
    assert_eq!(id, "m1");
    assert_eq!(receiver, "bob");
    assert_eq!(status, DeliveryStatus::Sent);

    // Bob gets exactly one background alert in his personal room.
    let note = recv_note(&mut bob).await;
    let Notification::BackgroundAlert(envelope) = note else {
        panic!("expected BackgroundAlert, got {note:?}");
    };
    assert_eq!(envelope.id, "m1");
    assert_eq!(envelope.body, "hi");
    assert_eq!(envelope.status, DeliveryStatus::Sent);
    assert_silent(&mut bob).await;

    // Bob confirms delivery; only alice's personal room hears about it.
    send_event(
        &mut bob,
        &ClientEvent::MessageDelivered {
            id: "m1".into(),
            sender: "alice".into(),
            receiver: "bob".into(),
        },
    )
    .await;

    let note = recv_note(&mut alice).await;
    let Notification::DeliveryUpdated { id, status, .. } = note else {
        panic!("expected DeliveryUpdated, got {note:?}");
    };
    assert_eq!(id, "m1");
    assert_eq!(status, DeliveryStatus::Delivered);
    assert_silent(&mut bob).await;

    // Alice opens the conversation room, then syncs on her own presence
    // echo so the join is visible before bob's chat-opened arrives.
    send_event(
        &mut alice,
        &ClientEvent::JoinConversation {
            user_a: "alice".into(),
            user_b: "bob".into(),
        },
    )
    .await;
    send_event(
        &mut alice,
        &ClientEvent::UserActive {
            identity: "alice".into(),
        },
    )
    .await;
    expect_presence(&mut alice, "alice", PresenceState::Online).await;
    expect_presence(&mut bob, "alice", PresenceState::Online).await;

    // Bob opens the chat: one coalesced seen signal to the room.
    send_event(
        &mut bob,
        &ClientEvent::ChatOpened {
            opener: "bob".into(),
            partner: "alice".into(),
        },
    )
    .await;

    let note = recv_note(&mut alice).await;
    let Notification::SeenUpdated { opener, partner, status } = note else {
        panic!("expected SeenUpdated, got {note:?}");
    };
    assert_eq!(opener, "bob");
    assert_eq!(partner, "alice");
    assert_eq!(status, DeliveryStatus::Seen);
}

#[tokio::test]
async fn receiver_in_room_suppresses_background_alert() {
    let addr = start_hub().await;

    let mut alice = connect_and_init(addr, "alice").await;
    let mut bob = connect_and_init(addr, "bob").await;
    expect_presence(&mut alice, "bob", PresenceState::Online).await;

    // Bob joins the conversation room, then syncs on his presence echo.
    send_event(
        &mut bob,
        &ClientEvent::JoinConversation {
            user_a: "bob".into(),
            user_b: "alice".into(),
        },
    )
    .await;
    send_event(
        &mut bob,
        &ClientEvent::UserActive {
            identity: "bob".into(),
        },
    )
    .await;
    expect_presence(&mut bob, "bob", PresenceState::Online).await;
    expect_presence(&mut alice, "bob", PresenceState::Online).await;

    send_event(
        &mut alice,
        &ClientEvent::SendMessage {
            id: "m2".into(),
            sender: "alice".into(),
            receiver: "bob".into(),
            body: "you there?".into(),
            timestamp: Timestamp::now(),
        },
    )
    .await;

    // Bob receives the room envelope and nothing else — no alert.
    let note = recv_note(&mut bob).await;
    let Notification::Message(envelope) = note else {
        panic!("expected Message, got {note:?}");
    };
    assert_eq!(envelope.id, "m2");
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn disconnect_broadcasts_offline_with_last_seen() {
    let addr = start_hub().await;

    let mut alice = connect_and_init(addr, "alice").await;
    let mut bob = connect_and_init(addr, "bob").await;
    expect_presence(&mut alice, "bob", PresenceState::Online).await;

    bob.close(None).await.expect("close should succeed");

    let note = recv_note(&mut alice).await;
    let Notification::PresenceChanged(update) = note else {
        panic!("expected PresenceChanged, got {note:?}");
    };
    assert_eq!(update.user, "bob");
    assert_eq!(update.state, PresenceState::Offline);
    assert!(update.last_seen.is_some());
}

#[tokio::test]
async fn sibling_connection_keeps_identity_online() {
    let addr = start_hub().await;

    let mut observer = connect_and_init(addr, "alice").await;
    let mut carol_phone = connect_and_init(addr, "carol").await;
    expect_presence(&mut observer, "carol", PresenceState::Online).await;
    let mut carol_laptop = connect_and_init(addr, "carol").await;
    expect_presence(&mut observer, "carol", PresenceState::Online).await;
    expect_presence(&mut carol_phone, "carol", PresenceState::Online).await;

    // Dropping one of carol's two connections must not flip her offline.
    carol_phone.close(None).await.expect("close should succeed");
    assert_silent(&mut observer).await;

    // Dropping the last one does.
    carol_laptop.close(None).await.expect("close should succeed");
    expect_presence(&mut observer, "carol", PresenceState::Offline).await;
}
