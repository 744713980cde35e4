use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::ParticipantEntity,
    dto::format_system_time,
};

/// Participant as returned to dashboards.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub id: u64,
    pub tournament_id: u64,
    pub name: String,
    pub seed: u32,
    pub email: Option<String>,
    pub misc: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ParticipantEntity> for ParticipantDto {
    fn from(value: &ParticipantEntity) -> Self {
        Self {
            id: value.id,
            tournament_id: value.tournament_id,
            name: value.name.clone(),
            seed: value.seed,
            email: value.email.clone(),
            misc: value.misc.clone(),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// `{"participants": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantListResponse {
    pub participants: Vec<ParticipantDto>,
}

/// `{"participant": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResponse {
    pub participant: ParticipantDto,
}

/// Payload registering a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantRequest {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: String,
    /// Defaults to one past the highest seed in use.
    #[validate(range(min = 1, max = 512, message = "must be between 1 and 512"))]
    pub seed: Option<u32>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub misc: Option<String>,
}

/// Partial edit of a participant.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantRequest {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: Option<String>,
    /// Only accepted while the tournament is pending.
    #[validate(range(min = 1, max = 512, message = "must be between 1 and 512"))]
    pub seed: Option<u32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub misc: Option<Option<String>>,
}

/// `{"tournamentId": 1, "participantId": 4}`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDeleted {
    pub tournament_id: u64,
    pub participant_id: u64,
}
