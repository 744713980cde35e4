//! Realtime event catalog and the helpers that broadcast each event.
//!
//! Tournament lifecycle, display, flyer and ticker events reach every socket. Match,
//! participant and station events only reach sockets subscribed to the tournament's room.

use serde::Serialize;
use tracing::debug;

use crate::{
    dto::{
        bracket::ParticipantsSeeded,
        events::DisplayEvent,
        flyer::FlyerDeleted,
        matches::{MatchDto, MatchesUpdate, StationAssigned},
        participant::{ParticipantDeleted, ParticipantDto},
        station::{StationDeleted, StationDto},
        ticker::TickerMessage,
        tournament::{TournamentDeleted, TournamentDto},
    },
    state::SharedState,
};

pub const TOURNAMENT_CREATED: &str = "tournament:created";
pub const TOURNAMENT_UPDATE: &str = "tournament:update";
pub const TOURNAMENT_DELETED: &str = "tournament:deleted";
pub const TOURNAMENT_STARTED: &str = "tournament:started";
pub const TOURNAMENT_RESET: &str = "tournament:reset";
pub const TOURNAMENT_COMPLETED: &str = "tournament:completed";
pub const MATCHES_UPDATE: &str = "matches:update";
pub const MATCH_UPDATED: &str = "match:updated";
pub const PARTICIPANT_CREATED: &str = "participant:created";
pub const PARTICIPANT_UPDATED: &str = "participant:updated";
pub const PARTICIPANT_DELETED: &str = "participant:deleted";
pub const PARTICIPANTS_SEEDED: &str = "participants:seeded";
pub const STATION_CREATED: &str = "station:created";
pub const STATION_DELETED: &str = "station:deleted";
pub const STATION_ASSIGNED: &str = "station:assigned";
pub const DISPLAY_REGISTERED: &str = "display:registered";
pub const DISPLAY_DISCONNECTED: &str = "display:disconnected";
pub const FLYER_DELETED: &str = "flyer:deleted";
pub const TICKER_MESSAGE: &str = "ticker:message";

/// Every event the server emits.
pub const WS_EVENTS: &[&str] = &[
    TOURNAMENT_CREATED,
    TOURNAMENT_UPDATE,
    TOURNAMENT_DELETED,
    TOURNAMENT_STARTED,
    TOURNAMENT_RESET,
    TOURNAMENT_COMPLETED,
    MATCHES_UPDATE,
    MATCH_UPDATED,
    PARTICIPANT_CREATED,
    PARTICIPANT_UPDATED,
    PARTICIPANT_DELETED,
    PARTICIPANTS_SEEDED,
    STATION_CREATED,
    STATION_DELETED,
    STATION_ASSIGNED,
    DISPLAY_REGISTERED,
    DISPLAY_DISCONNECTED,
    FLYER_DELETED,
    TICKER_MESSAGE,
];

fn send_event<T: Serialize>(state: &SharedState, room: Option<u64>, name: &'static str, data: &T) {
    debug!(event = name, room, "broadcasting event");
    state.hub().publish(room, name, data);
}

/// Lifecycle broadcasts share the tournament payload; `name` picks the event.
pub fn broadcast_tournament(state: &SharedState, name: &'static str, tournament: &TournamentDto) {
    send_event(state, None, name, tournament);
}

pub fn broadcast_tournament_deleted(state: &SharedState, tournament_id: u64) {
    send_event(
        state,
        None,
        TOURNAMENT_DELETED,
        &TournamentDeleted { tournament_id },
    );
}

/// Full match list with stats, the payload displays poll for.
pub fn broadcast_matches_update(state: &SharedState, update: &MatchesUpdate) {
    send_event(state, Some(update.tournament_id), MATCHES_UPDATE, update);
}

pub fn broadcast_match_updated(state: &SharedState, entry: &MatchDto) {
    send_event(state, Some(entry.tournament_id), MATCH_UPDATED, entry);
}

pub fn broadcast_participant(state: &SharedState, name: &'static str, participant: &ParticipantDto) {
    send_event(state, Some(participant.tournament_id), name, participant);
}

pub fn broadcast_participant_deleted(state: &SharedState, payload: &ParticipantDeleted) {
    send_event(state, Some(payload.tournament_id), PARTICIPANT_DELETED, payload);
}

pub fn broadcast_participants_seeded(state: &SharedState, payload: &ParticipantsSeeded) {
    send_event(state, Some(payload.tournament_id), PARTICIPANTS_SEEDED, payload);
}

pub fn broadcast_station_created(state: &SharedState, station: &StationDto) {
    send_event(state, Some(station.tournament_id), STATION_CREATED, station);
}

pub fn broadcast_station_deleted(state: &SharedState, payload: &StationDeleted) {
    send_event(state, Some(payload.tournament_id), STATION_DELETED, payload);
}

pub fn broadcast_station_assigned(state: &SharedState, payload: &StationAssigned) {
    send_event(state, Some(payload.tournament_id), STATION_ASSIGNED, payload);
}

pub fn broadcast_display(state: &SharedState, name: &'static str, display: &DisplayEvent) {
    send_event(state, None, name, display);
}

pub fn broadcast_flyer_deleted(state: &SharedState, filename: &str) {
    send_event(
        state,
        None,
        FLYER_DELETED,
        &FlyerDeleted {
            filename: filename.to_owned(),
        },
    );
}

pub fn broadcast_ticker(state: &SharedState, message: &TickerMessage) {
    send_event(state, None, TICKER_MESSAGE, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_no_duplicates() {
        let unique: std::collections::HashSet<_> = WS_EVENTS.iter().collect();
        assert_eq!(unique.len(), WS_EVENTS.len());
    }
}
