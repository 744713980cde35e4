use std::{sync::Arc, time::SystemTime};

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashSet;
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        events::{ClientFrame, DisplayEvent, DisplayRegister, Pong, RoomRequest, SocketError},
        format_system_time,
    },
    services::{events, match_service, status_service},
    state::{DisplayInfo, HubEvent, SharedState, encode_frame},
};

type Outbound = mpsc::UnboundedSender<Message>;

/// Rooms a socket is subscribed to.
type Rooms = Arc<DashSet<u64>>;

/// Handle the full lifecycle of a dashboard or display socket.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let connection_id = state.socket_opened();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    info!(connection_id, "socket connected");

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let rooms: Rooms = Arc::new(DashSet::new());
    let forwarder = tokio::spawn(forward_events(
        state.hub().subscribe(),
        rooms.clone(),
        outbound_tx.clone(),
        connection_id,
    ));

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_frame(&state, connection_id, &rooms, &outbound_tx, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(connection_id, error = %err, "websocket receive error");
                break;
            }
        }
    }

    forwarder.abort();
    let _ = forwarder.await;
    for closed in state.socket_closed(connection_id) {
        info!(connection_id, display_id = %closed.display_id, "display disconnected");
        events::broadcast_display(
            &state,
            events::DISPLAY_DISCONNECTED,
            &DisplayEvent {
                display_id: closed.display_id,
                display_type: closed.display_type,
            },
        );
    }
    info!(connection_id, "socket disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Relay hub events to one socket: global events always, room events only when subscribed.
async fn forward_events(
    mut hub: broadcast::Receiver<HubEvent>,
    rooms: Rooms,
    outbound: Outbound,
    connection_id: u64,
) {
    loop {
        match hub.recv().await {
            Ok(event) => {
                if event.room.is_some_and(|room| !rooms.contains(&room)) {
                    continue;
                }
                if outbound.send(Message::Text(event.frame.as_ref().into())).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(connection_id, skipped, "socket lagging behind; events skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Serialize and queue a frame for this socket only.
fn reply<T: Serialize>(outbound: &Outbound, event: &str, data: &T) {
    match encode_frame(event, data) {
        Ok(frame) => {
            let _ = outbound.send(Message::Text(frame.into()));
        }
        Err(err) => warn!(event, error = %err, "failed to encode socket reply"),
    }
}

fn reply_error(outbound: &Outbound, message: String) {
    reply(outbound, "error", &SocketError { message });
}

fn parse<T: DeserializeOwned>(event: &str, data: Value, outbound: &Outbound) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(data) => Some(data),
        Err(err) => {
            reply_error(outbound, format!("invalid `{event}` data: {err}"));
            None
        }
    }
}

async fn handle_frame(
    state: &SharedState,
    connection_id: u64,
    rooms: &Rooms,
    outbound: &Outbound,
    text: &str,
) {
    let ClientFrame { event, data } = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(connection_id, error = %err, "malformed socket frame");
            reply_error(outbound, format!("malformed frame: {err}"));
            return;
        }
    };
    debug!(connection_id, event = %event, "socket frame received");

    match event.as_str() {
        "subscribe" => {
            if let Some(request) = parse::<RoomRequest>(&event, data, outbound) {
                rooms.insert(request.tournament_id);
                info!(connection_id, tournament_id = request.tournament_id, "socket subscribed");
                reply(outbound, "subscribed", &request);
            }
        }
        "unsubscribe" => {
            if let Some(request) = parse::<RoomRequest>(&event, data, outbound) {
                rooms.remove(&request.tournament_id);
                reply(outbound, "unsubscribed", &request);
            }
        }
        "matches:request" => {
            let mut subscribed: Vec<u64> = rooms.iter().map(|room| *room).collect();
            if subscribed.is_empty() {
                // Displays never subscribe; they follow whatever is being played.
                subscribed.extend(active_tournament(state, connection_id).await);
            }
            for tournament_id in subscribed {
                match match_service::snapshot(state, tournament_id).await {
                    Ok(update) => reply(outbound, events::MATCHES_UPDATE, &update),
                    Err(err) => {
                        warn!(connection_id, tournament_id, error = %err, "match snapshot failed");
                        reply_error(outbound, err.to_string());
                    }
                }
            }
        }
        "display:register" => {
            if let Some(request) = parse::<DisplayRegister>(&event, data, outbound) {
                register_display(state, connection_id, rooms, request).await;
            }
        }
        "ping" => reply(
            outbound,
            "pong",
            &Pong {
                timestamp: format_system_time(SystemTime::now()),
            },
        ),
        other => info!(connection_id, event = other, "unknown socket event ignored"),
    }
}

/// Active tournament for sockets that did not pick one; lookup failures only get logged.
async fn active_tournament(state: &SharedState, connection_id: u64) -> Option<u64> {
    match status_service::active_tournament(state).await {
        Ok(active) => active,
        Err(err) => {
            debug!(connection_id, error = %err, "no active tournament lookup");
            None
        }
    }
}

/// Record a display, join it to the active tournament's room and announce it to everyone,
/// the registering socket included.
async fn register_display(
    state: &SharedState,
    connection_id: u64,
    rooms: &Rooms,
    request: DisplayRegister,
) {
    let display_id = request
        .display_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    state.displays().insert(
        display_id.clone(),
        DisplayInfo {
            display_id: display_id.clone(),
            display_type: request.display_type.clone(),
            connection_id,
            connected_at: SystemTime::now(),
        },
    );
    let joined = active_tournament(state, connection_id).await;
    if let Some(tournament_id) = joined {
        rooms.insert(tournament_id);
    }
    info!(
        connection_id,
        display_id = %display_id,
        display_type = %request.display_type,
        tournament_id = ?joined,
        "display registered"
    );
    events::broadcast_display(
        state,
        events::DISPLAY_REGISTERED,
        &DisplayEvent {
            display_id,
            display_type: request.display_type,
        },
    );
}

/// Tear down the outbound channel and wait for the writer task to finish.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: Outbound) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::tournament_store::MemoryStore,
        dto::{participant::CreateParticipantRequest, tournament::CreateTournamentRequest},
        services::{participant_service, tournament_service},
        state::AppState,
    };

    fn frame_of(message: Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribe_is_acknowledged() {
        let state = AppState::new(AppConfig::default(), None);
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(&state, 1, &rooms, &tx, r#"{"event":"subscribe","data":{"tournamentId":7}}"#)
            .await;
        assert!(rooms.contains(&7));
        let ack = frame_of(rx.recv().await.unwrap());
        assert_eq!(ack["event"], "subscribed");
        assert_eq!(ack["data"]["tournamentId"], 7);

        handle_frame(&state, 1, &rooms, &tx, r#"{"event":"unsubscribe","data":{"tournamentId":7}}"#)
            .await;
        assert!(rooms.is_empty());
    }

    async fn started_tournament() -> (SharedState, u64) {
        let state = AppState::new(AppConfig::default(), None);
        state.install_store(Arc::new(MemoryStore::new())).await;
        let request: CreateTournamentRequest =
            serde_json::from_value(serde_json::json!({"name": "Weekly", "url": "weekly"})).unwrap();
        let tournament = tournament_service::create(&state, request).await.unwrap();
        for name in ["Alice", "Bob"] {
            let participant = CreateParticipantRequest {
                name: name.into(),
                seed: None,
                email: None,
                misc: None,
            };
            participant_service::create(&state, "weekly", participant)
                .await
                .unwrap();
        }
        tournament_service::start(&state, "weekly").await.unwrap();
        (state, tournament.id)
    }

    #[tokio::test]
    async fn registered_display_follows_the_active_tournament() {
        let (state, tournament_id) = started_tournament().await;
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(
            &state,
            4,
            &rooms,
            &tx,
            r#"{"event":"display:register","data":{"displayType":"match"}}"#,
        )
        .await;
        assert!(rooms.contains(&tournament_id));

        handle_frame(&state, 4, &rooms, &tx, r#"{"event":"matches:request"}"#).await;
        let update = frame_of(rx.recv().await.unwrap());
        assert_eq!(update["event"], events::MATCHES_UPDATE);
        assert_eq!(update["data"]["tournamentId"], tournament_id);
        assert_eq!(update["data"]["matches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsubscribed_request_gets_the_active_tournament() {
        let (state, tournament_id) = started_tournament().await;
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(&state, 5, &rooms, &tx, r#"{"event":"matches:request"}"#).await;
        let update = frame_of(rx.recv().await.unwrap());
        assert_eq!(update["event"], events::MATCHES_UPDATE);
        assert_eq!(update["data"]["tournamentId"], tournament_id);
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn request_without_active_tournament_stays_quiet() {
        let state = AppState::new(AppConfig::default(), None);
        state.install_store(Arc::new(MemoryStore::new())).await;
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(&state, 6, &rooms, &tx, r#"{"event":"matches:request"}"#).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ping_and_bad_frames_get_replies() {
        let state = AppState::new(AppConfig::default(), None);
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_frame(&state, 1, &rooms, &tx, r#"{"event":"ping"}"#).await;
        assert_eq!(frame_of(rx.recv().await.unwrap())["event"], "pong");

        handle_frame(&state, 1, &rooms, &tx, "not json").await;
        assert_eq!(frame_of(rx.recv().await.unwrap())["event"], "error");

        handle_frame(&state, 1, &rooms, &tx, r#"{"event":"subscribe","data":{}}"#).await;
        assert_eq!(frame_of(rx.recv().await.unwrap())["event"], "error");

        handle_frame(&state, 1, &rooms, &tx, r#"{"event":"dance"}"#).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn display_registration_is_broadcast() {
        let state = AppState::new(AppConfig::default(), None);
        let mut hub = state.hub().subscribe();
        let rooms: Rooms = Arc::new(DashSet::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_frame(
            &state,
            3,
            &rooms,
            &tx,
            r#"{"event":"display:register","data":{"displayType":"bracket"}}"#,
        )
        .await;

        let event = hub.recv().await.unwrap();
        assert_eq!(event.name, events::DISPLAY_REGISTERED);
        let frame: Value = serde_json::from_str(&event.frame).unwrap();
        let display_id = frame["data"]["displayId"].as_str().unwrap().to_owned();
        assert!(!display_id.is_empty());
        assert_eq!(state.displays().get(&display_id).unwrap().connection_id, 3);
    }

    #[tokio::test]
    async fn room_events_only_reach_subscribers() {
        let state = AppState::new(AppConfig::default(), None);
        let rooms: Rooms = Arc::new(DashSet::new());
        rooms.insert(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_events(state.hub().subscribe(), rooms, tx, 9));

        state.hub().publish(Some(2), events::MATCH_UPDATED, &"other");
        state.hub().publish(Some(1), events::MATCH_UPDATED, &"mine");
        state.hub().publish(None, events::TICKER_MESSAGE, &"all");

        assert_eq!(frame_of(rx.recv().await.unwrap())["data"], "mine");
        assert_eq!(frame_of(rx.recv().await.unwrap())["data"], "all");
        forwarder.abort();
    }
}
