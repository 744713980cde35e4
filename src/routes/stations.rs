use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::{
        Success,
        station::{CreateStationRequest, StationDeleted, StationListResponse, StationResponse},
    },
    error::{AppError, ErrorBody},
    routes::extract::ValidatedJson,
    services::station_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/stations/{tournament_id}",
            get(list_stations).post(create_station),
        )
        .route(
            "/api/stations/{tournament_id}/{station_id}",
            delete(delete_station),
        )
}

/// Stations with the match each one hosts.
#[utoipa::path(
    get,
    path = "/api/stations/{tournament_id}",
    tag = "stations",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Stations", body = Success<StationListResponse>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn list_stations(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<StationListResponse>>, AppError> {
    let stations = station_service::list(&state, &tournament_id).await?;
    Ok(Json(Success::new(StationListResponse { stations })))
}

#[utoipa::path(
    post,
    path = "/api/stations/{tournament_id}",
    tag = "stations",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    request_body = CreateStationRequest,
    responses(
        (status = 201, description = "Station created", body = Success<StationResponse>),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 409, description = "Name already used", body = ErrorBody)
    )
)]
pub async fn create_station(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateStationRequest>,
) -> Result<(StatusCode, Json<Success<StationResponse>>), AppError> {
    let station = station_service::create(&state, &tournament_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(Success::new(StationResponse { station })),
    ))
}

/// Delete a station; its matches lose their assignment.
#[utoipa::path(
    delete,
    path = "/api/stations/{tournament_id}/{station_id}",
    tag = "stations",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("station_id" = u64, Path, description = "Station id")
    ),
    responses(
        (status = 200, description = "Station deleted", body = Success<StationDeleted>),
        (status = 404, description = "Unknown station", body = ErrorBody)
    )
)]
pub async fn delete_station(
    State(state): State<SharedState>,
    Path((tournament_id, station_id)): Path<(String, u64)>,
) -> Result<Json<Success<StationDeleted>>, AppError> {
    let deleted = station_service::delete(&state, &tournament_id, station_id).await?;
    Ok(Json(Success::new(deleted)))
}
