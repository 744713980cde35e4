//! Wire shapes of the Challonge v1 API and their conversion into local records.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    dao::models::{MatchEntity, ParticipantEntity, Prerequisite, TournamentEntity, TournamentType},
    state::{lifecycle::TournamentState, match_state::MatchState},
};

/// Parse a Challonge timestamp (`2024-03-02T18:04:11.000-05:00`).
pub fn parse_time(value: Option<&str>) -> Option<SystemTime> {
    value
        .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
        .map(SystemTime::from)
}

/// Format a timestamp the way Challonge accepts it.
pub fn format_time(value: SystemTime) -> Option<String> {
    OffsetDateTime::from(value).format(&Rfc3339).ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEnvelope {
    pub tournament: RemoteTournament,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantEnvelope {
    pub participant: RemoteParticipant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchEnvelope {
    #[serde(rename = "match")]
    pub entry: RemoteMatch,
}

/// Tournament as returned by `GET /tournaments/{url}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTournament {
    pub id: u64,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub game_name: Option<String>,
    pub tournament_type: String,
    pub state: String,
    #[serde(default)]
    pub hold_third_place_match: bool,
    #[serde(default)]
    pub signup_cap: Option<u32>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub check_in_duration: Option<u32>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub participants: Vec<ParticipantEnvelope>,
    #[serde(default)]
    pub matches: Vec<MatchEnvelope>,
}

impl RemoteTournament {
    /// Copy the remote fields onto `entity`, keeping local bookkeeping (id, version, created_at).
    pub fn apply_to(&self, entity: &mut TournamentEntity) {
        entity.url = self.url.clone();
        entity.name = self.name.clone();
        entity.description = self.description.clone().filter(|d| !d.is_empty());
        entity.game_name = self.game_name.clone();
        entity.tournament_type =
            TournamentType::parse(&self.tournament_type).unwrap_or(entity.tournament_type);
        entity.state = TournamentState::from_remote(&self.state);
        entity.hold_third_place_match = self.hold_third_place_match;
        entity.signup_cap = self.signup_cap;
        entity.start_at = parse_time(self.start_at.as_deref());
        entity.check_in_duration = self.check_in_duration;
        entity.started_at = parse_time(self.started_at.as_deref());
        entity.completed_at = parse_time(self.completed_at.as_deref());
        entity.remote_id = Some(self.id);
    }
}

/// Participant entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteParticipant {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub misc: Option<String>,
}

impl RemoteParticipant {
    /// Local participant record; `previous` keeps the local email and creation time.
    pub fn into_entity(
        self,
        tournament_id: u64,
        previous: Option<&ParticipantEntity>,
        now: SystemTime,
    ) -> ParticipantEntity {
        let name = self
            .name
            .filter(|name| !name.is_empty())
            .or(self.display_name)
            .unwrap_or_else(|| format!("Participant {}", self.id));
        ParticipantEntity {
            id: self.id,
            tournament_id,
            name,
            seed: self.seed.unwrap_or(0),
            email: previous.and_then(|p| p.email.clone()),
            misc: self.misc,
            created_at: previous.map_or(now, |p| p.created_at),
            updated_at: now,
        }
    }
}

/// Match entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMatch {
    pub id: u64,
    #[serde(default)]
    pub identifier: Option<String>,
    pub round: i32,
    #[serde(default)]
    pub suggested_play_order: Option<u32>,
    pub state: String,
    pub player1_id: Option<u64>,
    pub player2_id: Option<u64>,
    #[serde(default)]
    pub player1_prereq_match_id: Option<u64>,
    #[serde(default)]
    pub player2_prereq_match_id: Option<u64>,
    #[serde(default)]
    pub player1_is_prereq_match_loser: bool,
    #[serde(default)]
    pub player2_is_prereq_match_loser: bool,
    pub winner_id: Option<u64>,
    pub loser_id: Option<u64>,
    #[serde(default)]
    pub scores_csv: Option<String>,
    #[serde(default)]
    pub forfeited: Option<bool>,
    #[serde(default)]
    pub underway_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl RemoteMatch {
    /// Local match record. Station assignments only exist locally and are carried over.
    pub fn into_entity(self, tournament_id: u64, station_id: Option<u64>, now: SystemTime) -> MatchEntity {
        let prereq = |match_id: Option<u64>, loser: bool| {
            match_id.map(|match_id| Prerequisite { match_id, loser })
        };
        let state = MatchState::from_remote(&self.state);
        MatchEntity {
            id: self.id,
            tournament_id,
            identifier: self.identifier.unwrap_or_else(|| self.id.to_string()),
            round: self.round,
            suggested_play_order: self.suggested_play_order.unwrap_or(0),
            state,
            player1_id: self.player1_id,
            player2_id: self.player2_id,
            player1_prereq: prereq(
                self.player1_prereq_match_id,
                self.player1_is_prereq_match_loser,
            ),
            player2_prereq: prereq(
                self.player2_prereq_match_id,
                self.player2_is_prereq_match_loser,
            ),
            winner_id: self.winner_id,
            loser_id: self.loser_id,
            scores_csv: self.scores_csv.unwrap_or_default(),
            forfeited: self.forfeited.unwrap_or(false),
            underway_at: parse_time(self.underway_at.as_deref()),
            station_id: station_id.filter(|_| state != MatchState::Complete),
            completed_at: parse_time(self.completed_at.as_deref()),
            updated_at: now,
        }
    }
}

/// Tournament fields sent on create/update.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentBody {
    pub name: String,
    pub url: String,
    pub tournament_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    pub hold_third_place_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signup_cap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_duration: Option<u32>,
}

impl From<&TournamentEntity> for TournamentBody {
    fn from(value: &TournamentEntity) -> Self {
        Self {
            name: value.name.clone(),
            url: value.url.clone(),
            tournament_type: value.tournament_type.as_str(),
            description: value.description.clone(),
            game_name: value.game_name.clone(),
            hold_third_place_match: value.hold_third_place_match,
            signup_cap: value.signup_cap,
            start_at: value.start_at.and_then(format_time),
            check_in_duration: value.check_in_duration,
        }
    }
}

/// Participant fields sent on create/update.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParticipantBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc: Option<String>,
}

impl From<&ParticipantEntity> for ParticipantBody {
    fn from(value: &ParticipantEntity) -> Self {
        Self {
            name: value.name.clone(),
            seed: Some(value.seed),
            email: value.email.clone(),
            misc: value.misc.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "tournament": {
            "id": 9001,
            "url": "friday_weekly",
            "name": "Friday Weekly",
            "description": "",
            "game_name": "Tekken 8",
            "tournament_type": "double elimination",
            "state": "underway",
            "hold_third_place_match": false,
            "started_at": "2024-03-02T18:04:11.000-05:00",
            "participants": [
                {"participant": {"id": 11, "name": "", "display_name": "Alpha", "seed": 1}},
                {"participant": {"id": 12, "name": "Beta", "seed": 2, "misc": "pool A"}}
            ],
            "matches": [
                {"match": {
                    "id": 501, "identifier": "A", "round": 1, "suggested_play_order": 1,
                    "state": "open", "player1_id": 11, "player2_id": 12,
                    "winner_id": null, "loser_id": null, "scores_csv": "",
                    "underway_at": "2024-03-02T18:10:00-05:00"
                }},
                {"match": {
                    "id": 502, "identifier": "B", "round": -1, "state": "pending",
                    "player1_id": null, "player2_id": null,
                    "player1_prereq_match_id": 501, "player1_is_prereq_match_loser": true,
                    "winner_id": null, "loser_id": null
                }}
            ]
        }
    }"#;

    #[test]
    fn snapshot_converts_to_local_records() {
        let envelope: TournamentEnvelope = serde_json::from_str(SNAPSHOT).unwrap();
        let remote = envelope.tournament;
        assert_eq!(remote.participants.len(), 2);

        let now = SystemTime::now();
        let alpha = remote.participants[0]
            .participant
            .clone()
            .into_entity(1, None, now);
        assert_eq!(alpha.name, "Alpha");
        assert_eq!(alpha.tournament_id, 1);

        let first = remote.matches[0].entry.clone().into_entity(1, Some(3), now);
        assert_eq!(first.state, MatchState::Open);
        assert!(first.underway_at.is_some());
        assert_eq!(first.station_id, Some(3));

        let losers = remote.matches[1].entry.clone().into_entity(1, None, now);
        assert_eq!(
            losers.player1_prereq,
            Some(Prerequisite {
                match_id: 501,
                loser: true
            })
        );
        assert_eq!(losers.player2_prereq, None);
    }

    #[test]
    fn timestamps_round_trip() {
        let parsed = parse_time(Some("2024-03-02T18:04:11-05:00")).unwrap();
        let formatted = format_time(parsed).unwrap();
        assert_eq!(parse_time(Some(&formatted)), Some(parsed));
        assert_eq!(parse_time(Some("not a date")), None);
    }
}
