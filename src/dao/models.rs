use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;

use crate::state::{lifecycle::TournamentState, match_state::MatchState};

/// Bracket format of a tournament, using Challonge's wire names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum TournamentType {
    #[serde(rename = "single elimination")]
    SingleElimination,
    #[serde(rename = "double elimination")]
    DoubleElimination,
    #[serde(rename = "round robin")]
    RoundRobin,
}

impl TournamentType {
    /// Wire name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentType::SingleElimination => "single elimination",
            TournamentType::DoubleElimination => "double elimination",
            TournamentType::RoundRobin => "round robin",
        }
    }

    /// Parse a Challonge format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single elimination" => Some(TournamentType::SingleElimination),
            "double elimination" => Some(TournamentType::DoubleElimination),
            "round robin" => Some(TournamentType::RoundRobin),
            _ => None,
        }
    }
}

/// Tournament record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentEntity {
    /// Primary key of the tournament.
    pub id: u64,
    /// Unique url slug (Challonge `url`).
    pub url: String,
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    pub game_name: Option<String>,
    pub tournament_type: TournamentType,
    pub state: TournamentState,
    pub hold_third_place_match: bool,
    pub signup_cap: Option<u32>,
    pub start_at: Option<SystemTime>,
    /// Check-in window in minutes.
    pub check_in_duration: Option<u32>,
    pub started_at: Option<SystemTime>,
    pub completed_at: Option<SystemTime>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    /// Optimistic locking token, incremented on every write.
    pub version: u64,
    /// Challonge tournament id when the tournament is mirrored remotely.
    pub remote_id: Option<u64>,
    /// Last successful pull from Challonge.
    pub synced_at: Option<SystemTime>,
}

impl TournamentEntity {
    /// Whether writes must be forwarded to Challonge.
    pub fn is_linked(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Participant registered in a tournament.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    pub id: u64,
    pub tournament_id: u64,
    pub name: String,
    /// 1-based seed.
    pub seed: u32,
    pub email: Option<String>,
    pub misc: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Source of a match slot that is filled by the outcome of an earlier match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prerequisite {
    /// Match whose outcome fills the slot.
    pub match_id: u64,
    /// True when the loser (rather than the winner) of `match_id` fills the slot.
    pub loser: bool,
}

/// Match record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    pub id: u64,
    pub tournament_id: u64,
    /// Short label shown on brackets (A, B, ..., AA).
    pub identifier: String,
    /// Positive for winners side and round robin, negative for the losers bracket.
    pub round: i32,
    pub suggested_play_order: u32,
    /// Raw state as stored; see [`crate::state::match_state::effective_state`].
    pub state: MatchState,
    pub player1_id: Option<u64>,
    pub player2_id: Option<u64>,
    pub player1_prereq: Option<Prerequisite>,
    pub player2_prereq: Option<Prerequisite>,
    pub winner_id: Option<u64>,
    pub loser_id: Option<u64>,
    pub scores_csv: String,
    pub forfeited: bool,
    pub underway_at: Option<SystemTime>,
    pub station_id: Option<u64>,
    pub completed_at: Option<SystemTime>,
    pub updated_at: SystemTime,
}

impl MatchEntity {
    /// Whether the given participant plays in this match.
    pub fn has_player(&self, participant_id: u64) -> bool {
        self.player1_id == Some(participant_id) || self.player2_id == Some(participant_id)
    }

    /// Whether either slot is fed by the outcome of `match_id`.
    pub fn depends_on(&self, match_id: u64) -> bool {
        [self.player1_prereq, self.player2_prereq]
            .into_iter()
            .flatten()
            .any(|prereq| prereq.match_id == match_id)
    }
}

/// Physical play area (e.g. "TV 1") that matches can be assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationEntity {
    pub id: u64,
    pub tournament_id: u64,
    pub name: String,
    pub created_at: SystemTime,
}

/// Id sequences allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Tournament,
    Participant,
    Match,
    Station,
}

impl IdKind {
    /// Name of the sequence in persistent stores.
    pub fn sequence_name(self) -> &'static str {
        match self {
            IdKind::Tournament => "tournaments",
            IdKind::Participant => "participants",
            IdKind::Match => "matches",
            IdKind::Station => "stations",
        }
    }
}

/// Outcome of a version-checked tournament write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The write was applied; carries the stored record with its new version.
    Saved(TournamentEntity),
    /// The stored version did not match the expected token.
    Conflict { current_version: u64 },
    /// No tournament with this id exists.
    Missing,
    /// Another tournament already uses the new url.
    UrlTaken,
}
