use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::{
        Success,
        bracket::{
            ApplySeedsRequest, ApplySeedsResponse, BracketEditorResponse, BracketPreviewResponse,
            PreviewRequest, RandomizeResponse,
        },
    },
    error::{AppError, ErrorBody},
    routes::extract::{ValidatedJson, optional_json},
    services::bracket_service,
    state::SharedState,
};

/// Bracket editor routes, usable while a tournament is pending.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/bracket-editor/{tournament_id}", get(editor_summary))
        .route("/api/bracket-editor/{tournament_id}/preview", post(preview))
        .route("/api/bracket-editor/{tournament_id}/apply-seeds", post(apply_seeds))
        .route("/api/bracket-editor/{tournament_id}/randomize", post(randomize))
}

/// Tournament and participants in seed order.
#[utoipa::path(
    get,
    path = "/api/bracket-editor/{tournament_id}",
    tag = "bracket-editor",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Editor data", body = Success<BracketEditorResponse>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn editor_summary(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<BracketEditorResponse>>, AppError> {
    let summary = bracket_service::summary(&state, &tournament_id).await?;
    Ok(Json(Success::new(summary)))
}

/// Lay out the bracket for the current or a custom seed order. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/api/bracket-editor/{tournament_id}/preview",
    tag = "bracket-editor",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    request_body(content = Option<PreviewRequest>, description = "Empty body previews the stored seeds"),
    responses(
        (status = 200, description = "Bracket preview", body = Success<BracketPreviewResponse>),
        (status = 400, description = "Tournament started or invalid order", body = ErrorBody)
    )
)]
pub async fn preview(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    body: Bytes,
) -> Result<Json<Success<BracketPreviewResponse>>, AppError> {
    let request: PreviewRequest = optional_json(&body)?;
    let preview = bracket_service::preview(&state, &tournament_id, request).await?;
    Ok(Json(Success::new(preview)))
}

/// Persist seeds; entries are applied one by one and failures reported.
#[utoipa::path(
    post,
    path = "/api/bracket-editor/{tournament_id}/apply-seeds",
    tag = "bracket-editor",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    request_body = ApplySeedsRequest,
    responses(
        (status = 200, description = "Seeds applied", body = Success<ApplySeedsResponse>),
        (status = 400, description = "Duplicate or unknown entries", body = ErrorBody)
    )
)]
pub async fn apply_seeds(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ApplySeedsRequest>,
) -> Result<Json<Success<ApplySeedsResponse>>, AppError> {
    let outcome = bracket_service::apply_seeds(&state, &tournament_id, payload).await?;
    Ok(Json(Success::new(outcome)))
}

/// Propose a shuffled seed order without saving it.
#[utoipa::path(
    post,
    path = "/api/bracket-editor/{tournament_id}/randomize",
    tag = "bracket-editor",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Shuffled order", body = Success<RandomizeResponse>),
        (status = 400, description = "Tournament started", body = ErrorBody)
    )
)]
pub async fn randomize(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<RandomizeResponse>>, AppError> {
    let order = bracket_service::randomize(&state, &tournament_id).await?;
    Ok(Json(Success::new(order)))
}
