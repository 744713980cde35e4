use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle states of a tournament, using Challonge's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Participants and seeds can still be edited; no matches exist.
    Pending,
    /// Matches are being played.
    Underway,
    /// Every match is complete; waiting for the organiser to finalize.
    AwaitingReview,
    /// Finalized; results are frozen.
    Complete,
}

impl TournamentState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentState::Pending => "pending",
            TournamentState::Underway => "underway",
            TournamentState::AwaitingReview => "awaiting_review",
            TournamentState::Complete => "complete",
        }
    }

    /// Parse a Challonge state. Group stage and check-in variants collapse onto the closest
    /// state this service models.
    pub fn from_remote(value: &str) -> Self {
        match value {
            "pending" | "checking_in" | "checked_in" => TournamentState::Pending,
            "awaiting_review" => TournamentState::AwaitingReview,
            "complete" | "ended" => TournamentState::Complete,
            _ => TournamentState::Underway,
        }
    }

    /// Apply `event`, returning the next state when the transition is allowed.
    pub fn transition(self, event: LifecycleEvent) -> Result<Self, InvalidTransition> {
        let next = match (self, event) {
            (TournamentState::Pending, LifecycleEvent::Start) => TournamentState::Underway,
            (TournamentState::Underway, LifecycleEvent::AllMatchesComplete) => {
                TournamentState::AwaitingReview
            }
            (TournamentState::AwaitingReview, LifecycleEvent::MatchReopened) => {
                TournamentState::Underway
            }
            (TournamentState::AwaitingReview, LifecycleEvent::Finalize) => {
                TournamentState::Complete
            }
            (
                TournamentState::Underway
                | TournamentState::AwaitingReview
                | TournamentState::Complete,
                LifecycleEvent::Reset,
            ) => TournamentState::Pending,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Whether match results can currently be reported.
    pub fn accepts_results(self) -> bool {
        matches!(self, TournamentState::Underway)
    }
}

/// Events that move a tournament through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Organiser starts the bracket.
    Start,
    /// The last open match was completed.
    AllMatchesComplete,
    /// A completed match was reopened while awaiting review.
    MatchReopened,
    /// Organiser finalizes the results.
    Finalize,
    /// Organiser discards all results and returns to pending.
    Reset,
}

/// Error returned when an event cannot be applied in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {} a tournament that is {}", .event.verb(), .from.as_str())]
pub struct InvalidTransition {
    /// State the tournament was in.
    pub from: TournamentState,
    /// Rejected event.
    pub event: LifecycleEvent,
}

impl LifecycleEvent {
    fn verb(self) -> &'static str {
        match self {
            LifecycleEvent::Start => "start",
            LifecycleEvent::AllMatchesComplete => "close",
            LifecycleEvent::MatchReopened => "reopen matches of",
            LifecycleEvent::Finalize => "finalize",
            LifecycleEvent::Reset => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_happy_path() {
        let state = TournamentState::Pending;
        let state = state.transition(LifecycleEvent::Start).unwrap();
        assert_eq!(state, TournamentState::Underway);
        let state = state.transition(LifecycleEvent::AllMatchesComplete).unwrap();
        assert_eq!(state, TournamentState::AwaitingReview);
        let state = state.transition(LifecycleEvent::MatchReopened).unwrap();
        assert_eq!(state, TournamentState::Underway);
        let state = state
            .transition(LifecycleEvent::AllMatchesComplete)
            .unwrap()
            .transition(LifecycleEvent::Finalize)
            .unwrap();
        assert_eq!(state, TournamentState::Complete);
        assert_eq!(
            state.transition(LifecycleEvent::Reset).unwrap(),
            TournamentState::Pending
        );
    }

    #[test]
    fn start_requires_pending() {
        let err = TournamentState::Underway
            .transition(LifecycleEvent::Start)
            .unwrap_err();
        assert_eq!(err.from, TournamentState::Underway);
        assert_eq!(err.to_string(), "cannot start a tournament that is underway");
    }

    #[test]
    fn finalize_requires_review() {
        assert!(
            TournamentState::Underway
                .transition(LifecycleEvent::Finalize)
                .is_err()
        );
        assert!(
            TournamentState::Pending
                .transition(LifecycleEvent::Reset)
                .is_err()
        );
    }

    #[test]
    fn remote_states_are_mapped() {
        assert_eq!(
            TournamentState::from_remote("checking_in"),
            TournamentState::Pending
        );
        assert_eq!(
            TournamentState::from_remote("group_stages_underway"),
            TournamentState::Underway
        );
        assert_eq!(
            TournamentState::from_remote("awaiting_review"),
            TournamentState::AwaitingReview
        );
    }
}
