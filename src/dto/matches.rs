//! DTOs of the match listing, reporting and station assignment routes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use std::collections::HashMap;

use crate::{
    dao::models::MatchEntity,
    dto::{
        format_optional_time, format_system_time,
        validation::{duplicate_error, first_duplicate, validate_scores_csv},
    },
    state::match_state::{MatchState, effective_state},
};

/// Match enriched with names and its effective state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub id: u64,
    pub tournament_id: u64,
    pub identifier: String,
    pub round: i32,
    pub round_name: String,
    pub suggested_play_order: u32,
    /// Raw state as stored.
    pub state: MatchState,
    /// State shown to operators: `underway` as soon as `underwayAt` is set.
    pub effective_state: MatchState,
    pub player1_id: Option<u64>,
    pub player1_name: Option<String>,
    pub player2_id: Option<u64>,
    pub player2_name: Option<String>,
    pub player1_prereq_match_id: Option<u64>,
    pub player1_is_prereq_match_loser: bool,
    pub player2_prereq_match_id: Option<u64>,
    pub player2_is_prereq_match_loser: bool,
    pub winner_id: Option<u64>,
    pub loser_id: Option<u64>,
    pub scores_csv: String,
    pub forfeited: bool,
    pub underway_at: Option<String>,
    pub station_id: Option<u64>,
    pub station_name: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: String,
}

impl MatchDto {
    /// Enrich a stored match with its round name, player names and station name.
    pub fn build(
        entity: &MatchEntity,
        round_name: String,
        players: &HashMap<u64, String>,
        stations: &HashMap<u64, String>,
    ) -> Self {
        let name = |id: Option<u64>| id.and_then(|id| players.get(&id).cloned());
        Self {
            id: entity.id,
            tournament_id: entity.tournament_id,
            identifier: entity.identifier.clone(),
            round: entity.round,
            round_name,
            suggested_play_order: entity.suggested_play_order,
            state: entity.state,
            effective_state: effective_state(entity),
            player1_id: entity.player1_id,
            player1_name: name(entity.player1_id),
            player2_id: entity.player2_id,
            player2_name: name(entity.player2_id),
            player1_prereq_match_id: entity.player1_prereq.map(|p| p.match_id),
            player1_is_prereq_match_loser: entity.player1_prereq.is_some_and(|p| p.loser),
            player2_prereq_match_id: entity.player2_prereq.map(|p| p.match_id),
            player2_is_prereq_match_loser: entity.player2_prereq.is_some_and(|p| p.loser),
            winner_id: entity.winner_id,
            loser_id: entity.loser_id,
            scores_csv: entity.scores_csv.clone(),
            forfeited: entity.forfeited,
            underway_at: format_optional_time(entity.underway_at),
            station_id: entity.station_id,
            station_name: entity.station_id.and_then(|id| stations.get(&id).cloned()),
            completed_at: format_optional_time(entity.completed_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Progress counters over effective states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MatchStats {
    pub total: usize,
    pub completed: usize,
    pub underway: usize,
    pub open: usize,
    pub pending: usize,
    /// Completed share in percent, rounded down.
    pub progress: u32,
}

impl MatchStats {
    /// Count `matches` by effective state.
    pub fn tally(matches: &[MatchDto]) -> Self {
        let mut stats = Self {
            total: matches.len(),
            ..Self::default()
        };
        for entry in matches {
            match entry.effective_state {
                MatchState::Complete => stats.completed += 1,
                MatchState::Underway => stats.underway += 1,
                MatchState::Open => stats.open += 1,
                MatchState::Pending => stats.pending += 1,
            }
        }
        if stats.total > 0 {
            stats.progress = (stats.completed * 100 / stats.total) as u32;
        }
        stats
    }
}

/// `{"matches": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchListResponse {
    pub matches: Vec<MatchDto>,
}

/// `{"match": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub entry: MatchDto,
}

/// Payload of the `matches:update` event, also what displays poll.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchesUpdate {
    pub tournament_id: u64,
    pub matches: Vec<MatchDto>,
    pub stats: MatchStats,
}

/// Filters of `GET /api/matches/{tournamentId}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MatchListQuery {
    /// Keep matches whose effective state is this one.
    pub state: Option<MatchState>,
    /// Keep matches assigned to this station.
    pub station_id: Option<u64>,
}

/// Score update that leaves the match open.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreRequest {
    /// Sets such as `2-1,3-2`.
    #[validate(custom(function = "validate_scores_csv"))]
    pub scores: String,
}

/// Completes a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRequest {
    pub winner_id: u64,
    #[validate(custom(function = "validate_scores_csv"))]
    pub scores: String,
}

/// Completes a match by disqualification.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_distinct_players"))]
pub struct DqRequest {
    pub winner_id: u64,
    pub loser_id: u64,
}

fn validate_distinct_players(request: &DqRequest) -> Result<(), ValidationError> {
    if request.winner_id == request.loser_id {
        let mut err = ValidationError::new("same_player");
        err.message = Some("winner and loser must be different participants".into());
        return Err(err);
    }
    Ok(())
}

/// Station assignment; `null` unassigns.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StationAssignRequest {
    #[serde(default)]
    pub station_id: Option<u64>,
}

/// One entry of a batch score submission.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchScoreItem {
    pub match_id: u64,
    #[validate(custom(function = "validate_scores_csv"))]
    pub scores: String,
    /// When set the match is completed with this winner.
    pub winner_id: Option<u64>,
}

/// Several score reports applied independently.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_unique_matches", skip_on_field_errors = false))]
pub struct BatchScoresRequest {
    #[validate(length(min = 1, max = 100, message = "must contain 1 to 100 entries"), nested)]
    pub scores: Vec<BatchScoreItem>,
}

fn validate_unique_matches(request: &BatchScoresRequest) -> Result<(), ValidationError> {
    match first_duplicate(request.scores.iter().map(|item| item.match_id)) {
        Some(match_id) => Err(duplicate_error("match", match_id)),
        None => Ok(()),
    }
}

/// Failure of one batch entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub match_id: u64,
    pub error: String,
}

/// Outcome of a batch submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchScoresResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

/// Payload of the `station:assigned` event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StationAssigned {
    pub tournament_id: u64,
    pub match_id: u64,
    pub station_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_rejects_repeated_matches() {
        let request: BatchScoresRequest = serde_json::from_str(
            r#"{"scores": [{"matchId": 1, "scores": "2-0"}, {"matchId": 1, "scores": "0-2"}]}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn batch_item_scores_are_checked() {
        let request: BatchScoresRequest =
            serde_json::from_str(r#"{"scores": [{"matchId": 1, "scores": "two-one"}]}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn stats_count_effective_states() {
        let entity = |id: u64, state: MatchState, underway: bool| MatchEntity {
            id,
            tournament_id: 1,
            identifier: "A".into(),
            round: 1,
            suggested_play_order: id as u32,
            state,
            player1_id: Some(1),
            player2_id: Some(2),
            player1_prereq: None,
            player2_prereq: None,
            winner_id: None,
            loser_id: None,
            scores_csv: String::new(),
            forfeited: false,
            underway_at: underway.then(std::time::SystemTime::now),
            station_id: None,
            completed_at: None,
            updated_at: std::time::SystemTime::now(),
        };
        let empty = HashMap::new();
        let matches: Vec<MatchDto> = [
            entity(1, MatchState::Complete, false),
            entity(2, MatchState::Open, true),
            entity(3, MatchState::Open, false),
        ]
        .iter()
        .map(|entry| MatchDto::build(entry, "Finals".into(), &empty, &empty))
        .collect();

        let stats = MatchStats::tally(&matches);
        assert_eq!(
            stats,
            MatchStats {
                total: 3,
                completed: 1,
                underway: 1,
                open: 1,
                pending: 0,
                progress: 33,
            }
        );
        assert_eq!(MatchStats::tally(&[]).progress, 0);
    }

    #[test]
    fn dq_needs_two_players() {
        let request = DqRequest {
            winner_id: 3,
            loser_id: 3,
        };
        assert!(request.validate().is_err());
    }
}
