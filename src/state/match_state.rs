use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::MatchEntity;

/// Match states. `Underway` is only ever derived or received from Challonge; local writes mark
/// progress through `underway_at` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// At least one player is still unknown.
    Pending,
    /// Both players are known and the match can be played.
    Open,
    /// The match is being played.
    Underway,
    /// A winner was reported.
    Complete,
}

impl MatchState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchState::Pending => "pending",
            MatchState::Open => "open",
            MatchState::Underway => "underway",
            MatchState::Complete => "complete",
        }
    }

    /// Parse a Challonge match state, treating anything unknown as pending.
    pub fn from_remote(value: &str) -> Self {
        match value {
            "open" => MatchState::Open,
            "underway" => MatchState::Underway,
            "complete" => MatchState::Complete,
            _ => MatchState::Pending,
        }
    }

    /// Position in match listings: underway first, then open, pending, complete.
    pub fn display_priority(self) -> u8 {
        match self {
            MatchState::Underway => 0,
            MatchState::Open => 1,
            MatchState::Pending => 2,
            MatchState::Complete => 3,
        }
    }
}

/// Displayed state of a match.
///
/// `Complete` wins over everything; otherwise a set `underway_at` timestamp means the match is
/// underway even when the raw state still says `open`.
pub fn effective_state(entity: &MatchEntity) -> MatchState {
    if entity.state == MatchState::Complete {
        MatchState::Complete
    } else if entity.underway_at.is_some() {
        MatchState::Underway
    } else {
        entity.state
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn entity(state: MatchState, underway: bool) -> MatchEntity {
        MatchEntity {
            id: 1,
            tournament_id: 1,
            identifier: "A".into(),
            round: 1,
            suggested_play_order: 1,
            state,
            player1_id: Some(10),
            player2_id: Some(11),
            player1_prereq: None,
            player2_prereq: None,
            winner_id: None,
            loser_id: None,
            scores_csv: String::new(),
            forfeited: false,
            underway_at: underway.then(SystemTime::now),
            station_id: None,
            completed_at: None,
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn underway_timestamp_overrides_open() {
        assert_eq!(
            effective_state(&entity(MatchState::Open, true)),
            MatchState::Underway
        );
        assert_eq!(
            effective_state(&entity(MatchState::Pending, true)),
            MatchState::Underway
        );
    }

    #[test]
    fn complete_takes_precedence_over_underway() {
        assert_eq!(
            effective_state(&entity(MatchState::Complete, true)),
            MatchState::Complete
        );
    }

    #[test]
    fn raw_state_without_timestamp() {
        for state in [
            MatchState::Pending,
            MatchState::Open,
            MatchState::Underway,
            MatchState::Complete,
        ] {
            assert_eq!(effective_state(&entity(state, false)), state);
        }
    }
}
