//! DTOs of the tournament CRUD, lifecycle and Challonge import routes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{TournamentEntity, TournamentType},
    dto::{
        format_optional_time, format_system_time,
        validation::{validate_timestamp, validate_url_slug},
    },
    state::lifecycle::TournamentState,
};

/// Tournament as returned to dashboards.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDto {
    pub id: u64,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub game_name: Option<String>,
    pub tournament_type: TournamentType,
    pub state: TournamentState,
    pub hold_third_place_match: bool,
    pub signup_cap: Option<u32>,
    pub start_at: Option<String>,
    pub check_in_duration: Option<u32>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Token to send back as `expectedVersion` (or `If-Match`) when editing.
    pub version: u64,
    /// Whether the tournament is mirrored on Challonge.
    pub linked: bool,
    pub remote_id: Option<u64>,
    pub synced_at: Option<String>,
}

impl From<&TournamentEntity> for TournamentDto {
    fn from(value: &TournamentEntity) -> Self {
        Self {
            id: value.id,
            url: value.url.clone(),
            name: value.name.clone(),
            description: value.description.clone(),
            game_name: value.game_name.clone(),
            tournament_type: value.tournament_type,
            state: value.state,
            hold_third_place_match: value.hold_third_place_match,
            signup_cap: value.signup_cap,
            start_at: format_optional_time(value.start_at),
            check_in_duration: value.check_in_duration,
            started_at: format_optional_time(value.started_at),
            completed_at: format_optional_time(value.completed_at),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
            version: value.version,
            linked: value.is_linked(),
            remote_id: value.remote_id,
            synced_at: format_optional_time(value.synced_at),
        }
    }
}

/// `{"tournament": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentResponse {
    pub tournament: TournamentDto,
}

/// `{"tournaments": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct TournamentListResponse {
    pub tournaments: Vec<TournamentDto>,
}

/// Filter of `GET /api/tournaments`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TournamentListQuery {
    /// Only list tournaments in this state.
    pub state: Option<TournamentState>,
}

/// Payload creating a local tournament.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_url_slug"))]
    pub url: String,
    #[serde(default = "default_tournament_type")]
    pub tournament_type: TournamentType,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub game_name: Option<String>,
    #[serde(default)]
    pub hold_third_place_match: bool,
    #[validate(range(min = 2, max = 512, message = "must be between 2 and 512"))]
    pub signup_cap: Option<u32>,
    /// RFC 3339 timestamp.
    #[validate(custom(function = "validate_timestamp"))]
    pub start_at: Option<String>,
    /// Minutes.
    #[validate(range(max = 1440, message = "must be at most 1440 minutes"))]
    pub check_in_duration: Option<u32>,
}

fn default_tournament_type() -> TournamentType {
    TournamentType::SingleElimination
}

/// Partial edit of a tournament. Omitted fields are left unchanged; `null` clears optional ones.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTournamentRequest {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_url_slug"))]
    pub url: Option<String>,
    pub tournament_type: Option<TournamentType>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub game_name: Option<Option<String>>,
    pub hold_third_place_match: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<u32>)]
    #[validate(range(min = 2, max = 512, message = "must be between 2 and 512"))]
    pub signup_cap: Option<Option<u32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(custom(function = "validate_timestamp"))]
    pub start_at: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<u32>)]
    #[validate(range(max = 1440, message = "must be at most 1440 minutes"))]
    pub check_in_duration: Option<Option<u32>>,
    /// Version read by the client; alternatively sent as the `If-Match` header.
    pub expected_version: Option<u64>,
    /// Overwrite regardless of the stored version.
    #[serde(default)]
    pub force: bool,
}

/// Payload importing a Challonge tournament.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportTournamentRequest {
    /// Challonge url slug (`friday_weekly`, or `subdomain-friday_weekly`).
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub url: String,
}

/// `{"tournamentId": 3}`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDeleted {
    pub tournament_id: u64,
}
