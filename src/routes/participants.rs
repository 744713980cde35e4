use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    dto::{
        Success,
        participant::{
            CreateParticipantRequest, ParticipantDeleted, ParticipantListResponse,
            ParticipantResponse, UpdateParticipantRequest,
        },
    },
    error::{AppError, ErrorBody},
    routes::extract::ValidatedJson,
    services::participant_service,
    state::SharedState,
};

/// Participant management routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/participants/{tournament_id}",
            get(list_participants).post(create_participant),
        )
        .route(
            "/api/participants/{tournament_id}/{participant_id}",
            put(update_participant).delete(delete_participant),
        )
}

/// Participants in seed order.
#[utoipa::path(
    get,
    path = "/api/participants/{tournament_id}",
    tag = "participants",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Participants", body = Success<ParticipantListResponse>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn list_participants(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<ParticipantListResponse>>, AppError> {
    let participants = participant_service::list(&state, &tournament_id).await?;
    Ok(Json(Success::new(ParticipantListResponse { participants })))
}

/// Register a participant while the tournament is pending.
#[utoipa::path(
    post,
    path = "/api/participants/{tournament_id}",
    tag = "participants",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    request_body = CreateParticipantRequest,
    responses(
        (status = 201, description = "Participant added", body = Success<ParticipantResponse>),
        (status = 400, description = "Invalid payload or tournament started", body = ErrorBody)
    )
)]
pub async fn create_participant(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateParticipantRequest>,
) -> Result<(StatusCode, Json<Success<ParticipantResponse>>), AppError> {
    let participant = participant_service::create(&state, &tournament_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(Success::new(ParticipantResponse { participant })),
    ))
}

/// Edit a participant.
#[utoipa::path(
    put,
    path = "/api/participants/{tournament_id}/{participant_id}",
    tag = "participants",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("participant_id" = u64, Path, description = "Participant id")
    ),
    request_body = UpdateParticipantRequest,
    responses(
        (status = 200, description = "Participant updated", body = Success<ParticipantResponse>),
        (status = 404, description = "Unknown participant", body = ErrorBody)
    )
)]
pub async fn update_participant(
    State(state): State<SharedState>,
    Path((tournament_id, participant_id)): Path<(String, u64)>,
    ValidatedJson(payload): ValidatedJson<UpdateParticipantRequest>,
) -> Result<Json<Success<ParticipantResponse>>, AppError> {
    let participant =
        participant_service::update(&state, &tournament_id, participant_id, payload).await?;
    Ok(Json(Success::new(ParticipantResponse { participant })))
}

/// Remove a participant while the tournament is pending.
#[utoipa::path(
    delete,
    path = "/api/participants/{tournament_id}/{participant_id}",
    tag = "participants",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("participant_id" = u64, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Participant removed", body = Success<ParticipantDeleted>),
        (status = 400, description = "Tournament started", body = ErrorBody),
        (status = 404, description = "Unknown participant", body = ErrorBody)
    )
)]
pub async fn delete_participant(
    State(state): State<SharedState>,
    Path((tournament_id, participant_id)): Path<(String, u64)>,
) -> Result<Json<Success<ParticipantDeleted>>, AppError> {
    let deleted = participant_service::delete(&state, &tournament_id, participant_id).await?;
    Ok(Json(Success::new(deleted)))
}
