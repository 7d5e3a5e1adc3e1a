//! Hub core: shared state, WebSocket handler, and event dispatch.
//!
//! The hub accepts WebSocket connections, attaches client identities on
//! `Init`, and routes every inbound [`ClientEvent`] through a fixed order:
//! validate, mutate state, compute audience, emit. Malformed events are
//! dropped and logged; the connection stays up. Presence changes are the
//! only globally broadcast notification — everything else targets a
//! conversation room, a personal room, or a single connection.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chatpulse_proto::codec;
use chatpulse_proto::event::ClientEvent;
use chatpulse_proto::message::{DeliveryStatus, Envelope};
use chatpulse_proto::notify::Notification;
use chatpulse_proto::room;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::delivery::{DeliveryLedger, Transition};
use crate::presence::PresenceTracker;
use crate::registry::{AttachOutcome, ConnId, ConnectionRegistry};
use crate::rooms::RoomManager;

/// Shared hub state owning all connection, room, presence, and delivery
/// bookkeeping for this process.
pub struct HubState {
    /// Identity-to-connection mapping.
    pub registry: ConnectionRegistry,
    /// Conversation and personal room membership.
    pub rooms: RoomManager,
    /// Per-identity online/offline state.
    pub presence: PresenceTracker,
    /// Per-message delivery status state machine.
    pub delivery: DeliveryLedger,
    /// Maximum allowed message body size in bytes.
    max_body_bytes: usize,
}

impl Default for HubState {
    fn default() -> Self {
        Self::new()
    }
}

impl HubState {
    /// Creates hub state with the default body size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(chatpulse_proto::message::MAX_BODY_BYTES)
    }

    /// Creates hub state with a custom body size limit from the resolved
    /// [`crate::config::HubConfig`].
    #[must_use]
    pub fn with_config(max_body_bytes: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomManager::new(),
            presence: PresenceTracker::new(),
            delivery: DeliveryLedger::new(),
            max_body_bytes,
        }
    }
}

/// Handles an upgraded WebSocket connection for its whole lifetime.
///
/// The connection lifecycle:
/// 1. Register the connection (no identity yet).
/// 2. Spawn a writer task draining the outbound channel.
/// 3. Read frames, dispatching each event to completion before the next.
/// 4. On disconnect, leave all rooms and detach; if this was the
///    identity's last connection, broadcast presence offline.
pub async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = state.registry.insert(tx).await;
    tracing::info!(conn = conn_id, "connection accepted");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn = conn_id, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_frame(&reader_state, conn_id, &data).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn = conn_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    cleanup_connection(&state, conn_id).await;
}

/// Decodes a binary frame and dispatches the event inside.
async fn handle_frame(state: &Arc<HubState>, conn_id: ConnId, data: &[u8]) {
    match codec::decode_event(data) {
        Ok(event) => handle_event(state, conn_id, event).await,
        Err(e) => {
            tracing::warn!(conn = conn_id, error = %e, "failed to decode event");
        }
    }
}

/// Routes one inbound event: validate, mutate state, compute audience,
/// emit. Every state mutation pairs with at least one outbound
/// notification; every rejection is a silent drop plus a log record.
pub async fn handle_event(state: &Arc<HubState>, conn_id: ConnId, event: ClientEvent) {
    match event {
        ClientEvent::Init { identity } => {
            match state.registry.attach(conn_id, &identity).await {
                AttachOutcome::Attached { identity, previous } => {
                    if let Some(prev) = previous {
                        tracing::info!(conn = conn_id, from = %prev, to = %identity, "identity re-bound");
                        state.rooms.leave(conn_id, &prev).await;
                    }
                    state.rooms.join(conn_id, &identity).await;
                    let update = state.presence.mark_online(&identity).await;
                    tracing::info!(conn = conn_id, user = %identity, "identity attached");
                    broadcast_all(state, &Notification::PresenceChanged(update)).await;
                }
                AttachOutcome::Rejected => {
                    tracing::warn!(conn = conn_id, "init with invalid identity");
                }
            }
        }

        ClientEvent::UserActive { identity } => {
            let Ok(identity) = room::trimmed_identity(&identity) else {
                tracing::warn!(conn = conn_id, "user-active with invalid identity");
                return;
            };
            let update = state.presence.mark_online(identity).await;
            broadcast_all(state, &Notification::PresenceChanged(update)).await;
        }

        ClientEvent::UserInactive { identity } => {
            let Ok(identity) = room::trimmed_identity(&identity) else {
                tracing::warn!(conn = conn_id, "user-inactive with invalid identity");
                return;
            };
            let update = state.presence.mark_offline(identity).await;
            broadcast_all(state, &Notification::PresenceChanged(update)).await;
        }

        ClientEvent::JoinConversation { user_a, user_b } => {
            match room::conversation_key(&user_a, &user_b) {
                Ok(key) => {
                    state.rooms.join(conn_id, &key).await;
                    tracing::debug!(conn = conn_id, room = %key, "joined conversation");
                }
                Err(e) => {
                    tracing::warn!(conn = conn_id, error = %e, "join conversation rejected");
                }
            }
        }

        ClientEvent::SendMessage {
            id,
            sender,
            receiver,
            body,
            timestamp,
        } => {
            let (Ok(sender_id), Ok(receiver_id)) = (
                room::trimmed_identity(&sender),
                room::trimmed_identity(&receiver),
            ) else {
                tracing::warn!(conn = conn_id, "send with invalid participant");
                return;
            };
            if body.len() > state.max_body_bytes {
                tracing::warn!(
                    conn = conn_id,
                    size = body.len(),
                    max = state.max_body_bytes,
                    "message body exceeds size limit"
                );
                return;
            }
            let Ok(conversation) = room::conversation_key(sender_id, receiver_id) else {
                return;
            };

            if state.delivery.record_sent(sender_id, &id, receiver_id).await
                == Transition::Stale
            {
                tracing::debug!(conn = conn_id, id = %id, "duplicate send dropped");
                return;
            }

            let envelope = Envelope {
                id,
                sender: sender_id.to_string(),
                receiver: receiver_id.to_string(),
                body,
                timestamp,
                status: DeliveryStatus::Sent,
            };

            tracing::debug!(
                conn = conn_id,
                id = %envelope.id,
                room = %conversation,
                "relaying message"
            );
            broadcast_room(state, &conversation, &Notification::Message(envelope.clone())).await;

            // Occupancy excludes every connection of the sender, so a second
            // device of the sender's does not suppress the alert.
            let mut excluding: HashSet<ConnId> =
                state.registry.connections_for(sender_id).await;
            excluding.insert(conn_id);
            if !state.rooms.occupied_excluding(&conversation, &excluding).await {
                tracing::debug!(
                    id = %envelope.id,
                    receiver = %receiver_id,
                    "receiver not in room, sending background alert"
                );
                broadcast_room(
                    state,
                    receiver_id,
                    &Notification::BackgroundAlert(envelope.clone()),
                )
                .await;
            }

            send_to_conn(
                state,
                conn_id,
                &Notification::SendAck {
                    id: envelope.id,
                    receiver: envelope.receiver,
                    status: DeliveryStatus::Sent,
                },
            )
            .await;
        }

        ClientEvent::MessageDelivered { id, sender, receiver } => {
            let (Ok(sender_id), Ok(receiver_id)) = (
                room::trimmed_identity(&sender),
                room::trimmed_identity(&receiver),
            ) else {
                tracing::warn!(conn = conn_id, "delivered with invalid participant");
                return;
            };
            if id.trim().is_empty() {
                tracing::warn!(conn = conn_id, "delivered with empty message id");
                return;
            }

            match state.delivery.mark_delivered(sender_id, &id).await {
                Transition::Advanced(status) => {
                    // Sender's personal room only; the receiver already
                    // knows it delivered.
                    broadcast_room(
                        state,
                        sender_id,
                        &Notification::DeliveryUpdated {
                            id,
                            sender: sender_id.to_string(),
                            receiver: receiver_id.to_string(),
                            status,
                        },
                    )
                    .await;
                }
                Transition::Stale => {
                    tracing::debug!(id = %id, sender = %sender_id, "stale delivered signal");
                }
            }
        }

        ClientEvent::ChatOpened { opener, partner } => {
            let (Ok(opener_id), Ok(partner_id)) = (
                room::trimmed_identity(&opener),
                room::trimmed_identity(&partner),
            ) else {
                tracing::warn!(conn = conn_id, "chat-opened with invalid participant");
                return;
            };
            let Ok(conversation) = room::conversation_key(opener_id, partner_id) else {
                return;
            };

            let advanced = state
                .delivery
                .mark_conversation_seen(partner_id, opener_id)
                .await;
            tracing::debug!(
                opener = %opener_id,
                partner = %partner_id,
                advanced,
                "conversation seen"
            );

            // One coalesced signal for the whole conversation; both sides'
            // open chat views update from it.
            broadcast_room(
                state,
                &conversation,
                &Notification::SeenUpdated {
                    opener: opener_id.to_string(),
                    partner: partner_id.to_string(),
                    status: DeliveryStatus::Seen,
                },
            )
            .await;
        }
    }
}

/// Tears down a connection after its socket closes.
///
/// Leaves every room, detaches the identity, and broadcasts presence
/// offline only when this was the identity's last live connection —
/// sibling connections keep the user online.
async fn cleanup_connection(state: &Arc<HubState>, conn_id: ConnId) {
    state.rooms.leave_all(conn_id).await;
    let detached = state.registry.detach(conn_id).await;

    match detached.identity {
        Some(identity) if detached.was_last => {
            let update = state.presence.mark_offline(&identity).await;
            tracing::info!(conn = conn_id, user = %identity, "last connection closed, going offline");
            broadcast_all(state, &Notification::PresenceChanged(update)).await;
        }
        Some(identity) => {
            tracing::info!(conn = conn_id, user = %identity, "connection closed, siblings remain");
        }
        None => {
            tracing::info!(conn = conn_id, "anonymous connection closed");
        }
    }
}

/// Sends a notification to a single connection.
async fn send_to_conn(state: &Arc<HubState>, conn_id: ConnId, note: &Notification) {
    if let Some(sender) = state.registry.sender(conn_id).await
        && let Ok(bytes) = codec::encode_notification(note)
    {
        let _ = sender.send(Message::Binary(bytes.into()));
    }
}

/// Broadcasts a notification to every member of a room.
///
/// A room with no live members means there are simply no immediate
/// recipients — not an error.
async fn broadcast_room(state: &Arc<HubState>, room_id: &str, note: &Notification) {
    let Ok(bytes) = codec::encode_notification(note) else {
        tracing::error!(room = %room_id, "failed to encode notification");
        return;
    };
    for conn_id in state.rooms.members(room_id).await {
        if let Some(sender) = state.registry.sender(conn_id).await {
            let _ = sender.send(Message::Binary(bytes.clone().into()));
        }
    }
}

/// Broadcasts a notification to every live connection. Reserved for
/// presence updates.
async fn broadcast_all(state: &Arc<HubState>, note: &Notification) {
    let Ok(bytes) = codec::encode_notification(note) else {
        tracing::error!("failed to encode notification");
        return;
    };
    for sender in state.registry.all_senders().await {
        let _ = sender.send(Message::Binary(bytes.clone().into()));
    }
}

/// Starts the hub server on the given address and returns the bound
/// address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(HubState::new())).await
}

/// Starts the hub server with a pre-configured [`HubState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<HubState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "hub server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<HubState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
