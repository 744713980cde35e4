//! DTOs of the bracket editor: preview, seed application and shuffling.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    bracket::layout::RoundLayout,
    dao::models::TournamentType,
    dto::{
        participant::ParticipantDto,
        tournament::TournamentDto,
        validation::{duplicate_error, first_duplicate},
    },
};

/// Optional custom order for a preview.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Participant ids, first entry takes seed 1. Unlisted participants follow by seed.
    #[validate(length(max = 512, message = "must contain at most 512 entries"))]
    pub seed_order: Option<Vec<u64>>,
}

/// Participant as placed in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PreviewParticipant {
    pub id: u64,
    pub name: String,
    pub seed: u32,
}

/// Visualisation payload for the editor canvas.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BracketPreviewResponse {
    pub tournament_type: TournamentType,
    /// Participants in preview order.
    pub participants: Vec<PreviewParticipant>,
    pub rounds: Vec<RoundLayout>,
    pub width: u32,
    pub height: u32,
    pub match_count: usize,
}

/// One seed assignment.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeedAssignment {
    pub participant_id: u64,
    #[validate(range(min = 1, max = 512, message = "must be between 1 and 512"))]
    pub seed: u32,
}

/// Seeds to persist. Participant ids and seed values must both be unique.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_unique_assignments", skip_on_field_errors = false))]
pub struct ApplySeedsRequest {
    #[validate(length(min = 1, max = 512, message = "must contain 1 to 512 entries"), nested)]
    pub seeds: Vec<SeedAssignment>,
}

fn validate_unique_assignments(request: &ApplySeedsRequest) -> Result<(), ValidationError> {
    if let Some(id) = first_duplicate(request.seeds.iter().map(|s| s.participant_id)) {
        return Err(duplicate_error("participant", id));
    }
    if let Some(seed) = first_duplicate(request.seeds.iter().map(|s| s.seed)) {
        return Err(duplicate_error("seed", seed));
    }
    Ok(())
}

/// Failure of one seed assignment.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedFailure {
    pub participant_id: u64,
    pub error: String,
}

/// Outcome of a seed application.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplySeedsResponse {
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<SeedFailure>,
}

/// Payload of the `participants:seeded` event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsSeeded {
    pub tournament_id: u64,
    pub updated: usize,
    pub failed: usize,
}

/// Editor landing data.
#[derive(Debug, Serialize, ToSchema)]
pub struct BracketEditorResponse {
    pub tournament: TournamentDto,
    /// Participants in seed order.
    pub participants: Vec<ParticipantDto>,
}

/// Shuffled order proposed by the editor.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RandomizeResponse {
    pub seed_order: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(seeds: &[(u64, u32)]) -> ApplySeedsRequest {
        ApplySeedsRequest {
            seeds: seeds
                .iter()
                .map(|(participant_id, seed)| SeedAssignment {
                    participant_id: *participant_id,
                    seed: *seed,
                })
                .collect(),
        }
    }

    #[test]
    fn duplicate_seed_is_rejected() {
        assert!(request(&[(1, 1), (2, 2)]).validate().is_ok());
        assert!(request(&[(1, 1), (2, 1)]).validate().is_err());
        assert!(request(&[(1, 1), (1, 2)]).validate().is_err());
    }

    #[test]
    fn seed_bounds() {
        assert!(request(&[(1, 0)]).validate().is_err());
        assert!(request(&[]).validate().is_err());
    }
}
