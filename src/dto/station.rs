use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, StationEntity},
    dto::format_system_time,
};

/// Station with the match it currently hosts.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub id: u64,
    pub tournament_id: u64,
    pub name: String,
    /// Unfinished match assigned to the station.
    pub match_id: Option<u64>,
    pub match_identifier: Option<String>,
    pub created_at: String,
}

impl StationDto {
    pub fn new(station: &StationEntity, assigned: Option<&MatchEntity>) -> Self {
        Self {
            id: station.id,
            tournament_id: station.tournament_id,
            name: station.name.clone(),
            match_id: assigned.map(|entry| entry.id),
            match_identifier: assigned.map(|entry| entry.identifier.clone()),
            created_at: format_system_time(station.created_at),
        }
    }
}

/// `{"stations": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct StationListResponse {
    pub stations: Vec<StationDto>,
}

/// `{"station": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct StationResponse {
    pub station: StationDto,
}

/// Payload creating a station.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateStationRequest {
    #[validate(length(min = 1, max = 32, message = "must be 1 to 32 characters"))]
    pub name: String,
}

/// `{"tournamentId": 1, "stationId": 2}`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StationDeleted {
    pub tournament_id: u64,
    pub station_id: u64,
}
