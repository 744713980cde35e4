use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};

use crate::{
    dto::{
        Success,
        tournament::{
            CreateTournamentRequest, ImportTournamentRequest, TournamentDeleted, TournamentDto,
            TournamentListQuery, TournamentListResponse, TournamentResponse,
            UpdateTournamentRequest,
        },
    },
    error::{AppError, ErrorBody},
    routes::extract::{ValidatedJson, if_match},
    services::tournament_service,
    state::SharedState,
};

/// Tournament CRUD, lifecycle and Challonge import routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/tournaments", get(list_tournaments).post(create_tournament))
        .route("/api/tournaments/import", post(import_tournament))
        .route(
            "/api/tournament/{id}",
            get(get_tournament)
                .put(update_tournament)
                .delete(delete_tournament),
        )
        .route("/api/tournament/{id}/start", post(start_tournament))
        .route("/api/tournament/{id}/reset", post(reset_tournament))
        .route("/api/tournament/{id}/complete", post(complete_tournament))
        .route("/api/tournament/{id}/sync", post(sync_tournament))
}

fn wrap(tournament: TournamentDto) -> Json<Success<TournamentResponse>> {
    Json(Success::new(TournamentResponse { tournament }))
}

/// List tournaments, newest first.
#[utoipa::path(
    get,
    path = "/api/tournaments",
    tag = "tournaments",
    params(TournamentListQuery),
    responses(
        (status = 200, description = "Tournaments", body = Success<TournamentListResponse>),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn list_tournaments(
    State(state): State<SharedState>,
    Query(query): Query<TournamentListQuery>,
) -> Result<Json<Success<TournamentListResponse>>, AppError> {
    let tournaments = tournament_service::list(&state, query).await?;
    Ok(Json(Success::new(TournamentListResponse { tournaments })))
}

/// Create a local tournament.
#[utoipa::path(
    post,
    path = "/api/tournaments",
    tag = "tournaments",
    request_body = CreateTournamentRequest,
    responses(
        (status = 201, description = "Tournament created", body = Success<TournamentResponse>),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 409, description = "Url already taken", body = ErrorBody)
    )
)]
pub async fn create_tournament(
    State(state): State<SharedState>,
    ValidatedJson(payload): ValidatedJson<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<Success<TournamentResponse>>), AppError> {
    let created = tournament_service::create(&state, payload).await?;
    Ok((StatusCode::CREATED, wrap(created)))
}

/// Import a Challonge tournament as a linked tournament.
#[utoipa::path(
    post,
    path = "/api/tournaments/import",
    tag = "tournaments",
    request_body = ImportTournamentRequest,
    responses(
        (status = 201, description = "Tournament imported", body = Success<TournamentResponse>),
        (status = 404, description = "Unknown on Challonge", body = ErrorBody),
        (status = 502, description = "Challonge failure", body = ErrorBody),
        (status = 503, description = "Challonge not configured", body = ErrorBody)
    )
)]
pub async fn import_tournament(
    State(state): State<SharedState>,
    ValidatedJson(payload): ValidatedJson<ImportTournamentRequest>,
) -> Result<(StatusCode, Json<Success<TournamentResponse>>), AppError> {
    let imported = tournament_service::import(&state, &payload.url).await?;
    Ok((StatusCode::CREATED, wrap(imported)))
}

/// Fetch a tournament by id or url slug.
#[utoipa::path(
    get,
    path = "/api/tournament/{id}",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament", body = Success<TournamentResponse>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn get_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    Ok(wrap(tournament_service::get(&state, &id).await?))
}

/// Edit a tournament with optimistic locking.
#[utoipa::path(
    put,
    path = "/api/tournament/{id}",
    tag = "tournaments",
    params(
        ("id" = String, Path, description = "Tournament id or url slug"),
        ("If-Match" = Option<String>, Header, description = "Version token, alternative to expectedVersion")
    ),
    request_body = UpdateTournamentRequest,
    responses(
        (status = 200, description = "Tournament updated", body = Success<TournamentResponse>),
        (status = 400, description = "Invalid payload or missing version", body = ErrorBody),
        (status = 409, description = "Modified by someone else", body = ErrorBody)
    )
)]
pub async fn update_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateTournamentRequest>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    let version = if_match(&headers)?;
    Ok(wrap(
        tournament_service::update(&state, &id, payload, version).await?,
    ))
}

/// Delete a tournament with its participants, matches and stations.
#[utoipa::path(
    delete,
    path = "/api/tournament/{id}",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament deleted", body = Success<TournamentDeleted>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn delete_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentDeleted>>, AppError> {
    let tournament_id = tournament_service::delete(&state, &id).await?;
    Ok(Json(Success::new(TournamentDeleted { tournament_id })))
}

/// Start the tournament and generate its matches.
#[utoipa::path(
    post,
    path = "/api/tournament/{id}/start",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament started", body = Success<TournamentResponse>),
        (status = 400, description = "Not pending or too few participants", body = ErrorBody)
    )
)]
pub async fn start_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    Ok(wrap(tournament_service::start(&state, &id).await?))
}

/// Discard all results and go back to pending.
#[utoipa::path(
    post,
    path = "/api/tournament/{id}/reset",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament reset", body = Success<TournamentResponse>),
        (status = 400, description = "Tournament is pending", body = ErrorBody)
    )
)]
pub async fn reset_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    Ok(wrap(tournament_service::reset(&state, &id).await?))
}

/// Finalize a tournament whose matches are all complete.
#[utoipa::path(
    post,
    path = "/api/tournament/{id}/complete",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament finalized", body = Success<TournamentResponse>),
        (status = 400, description = "Matches still open", body = ErrorBody)
    )
)]
pub async fn complete_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    Ok(wrap(tournament_service::complete(&state, &id).await?))
}

/// Re-pull a linked tournament from Challonge.
#[utoipa::path(
    post,
    path = "/api/tournament/{id}/sync",
    tag = "tournaments",
    params(("id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Tournament synced", body = Success<TournamentResponse>),
        (status = 400, description = "Tournament is not linked", body = ErrorBody),
        (status = 503, description = "Challonge not configured", body = ErrorBody)
    )
)]
pub async fn sync_tournament(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Success<TournamentResponse>>, AppError> {
    Ok(wrap(tournament_service::sync(&state, &id).await?))
}
