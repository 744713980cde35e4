use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::{
        Success,
        matches::{
            BatchScoresRequest, BatchScoresResponse, DqRequest, MatchDto, MatchListQuery,
            MatchListResponse, MatchResponse, MatchStats, ScoreRequest,
            StationAssignRequest, WinnerRequest,
        },
    },
    error::{AppError, ErrorBody},
    routes::extract::ValidatedJson,
    services::match_service::{self, Report},
    state::SharedState,
};

/// Match listing, reporting and station assignment routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/matches/{tournament_id}", get(list_matches))
        .route("/api/matches/{tournament_id}/stats", get(match_stats))
        .route("/api/matches/{tournament_id}/batch-scores", post(batch_scores))
        .route("/api/matches/{tournament_id}/{match_id}", get(get_match))
        .route(
            "/api/matches/{tournament_id}/{match_id}/underway",
            post(mark_underway),
        )
        .route(
            "/api/matches/{tournament_id}/{match_id}/unmark-underway",
            post(unmark_underway),
        )
        .route("/api/matches/{tournament_id}/{match_id}/score", post(report_score))
        .route("/api/matches/{tournament_id}/{match_id}/winner", post(report_winner))
        .route("/api/matches/{tournament_id}/{match_id}/dq", post(disqualify))
        .route("/api/matches/{tournament_id}/{match_id}/reopen", post(reopen_match))
        .route("/api/matches/{tournament_id}/{match_id}/station", post(assign_station))
}

fn wrap(entry: MatchDto) -> Json<Success<MatchResponse>> {
    Json(Success::new(MatchResponse { entry }))
}

async fn report(
    state: &SharedState,
    tournament_id: &str,
    match_id: u64,
    report: Report,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    Ok(wrap(
        match_service::report(state, tournament_id, match_id, report).await?,
    ))
}

/// Matches in display order, optionally filtered.
#[utoipa::path(
    get,
    path = "/api/matches/{tournament_id}",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        MatchListQuery
    ),
    responses(
        (status = 200, description = "Matches", body = Success<MatchListResponse>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Success<MatchListResponse>>, AppError> {
    let matches = match_service::list(&state, &tournament_id, query).await?;
    Ok(Json(Success::new(MatchListResponse { matches })))
}

/// Counts per effective state and completion percentage, at the top level of the body.
#[utoipa::path(
    get,
    path = "/api/matches/{tournament_id}/stats",
    tag = "matches",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    responses(
        (status = 200, description = "Match statistics", body = Success<MatchStats>),
        (status = 404, description = "Unknown tournament", body = ErrorBody)
    )
)]
pub async fn match_stats(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<MatchStats>>, AppError> {
    let stats = match_service::stats(&state, &tournament_id).await?;
    Ok(Json(Success::new(stats)))
}

#[utoipa::path(
    get,
    path = "/api/matches/{tournament_id}/{match_id}",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    responses(
        (status = 200, description = "Match", body = Success<MatchResponse>),
        (status = 404, description = "Unknown tournament or match", body = ErrorBody)
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    Ok(wrap(
        match_service::get(&state, &tournament_id, match_id).await?,
    ))
}

/// Flag a match as being played.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/underway",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    responses(
        (status = 200, description = "Match underway", body = Success<MatchResponse>),
        (status = 400, description = "Match is not open", body = ErrorBody)
    )
)]
pub async fn mark_underway(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    report(&state, &tournament_id, match_id, Report::MarkUnderway).await
}

#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/unmark-underway",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    responses(
        (status = 200, description = "Match back to open", body = Success<MatchResponse>),
        (status = 400, description = "Match is not underway", body = ErrorBody)
    )
)]
pub async fn unmark_underway(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    report(&state, &tournament_id, match_id, Report::UnmarkUnderway).await
}

/// Record set scores without completing the match.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/score",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Scores recorded", body = Success<MatchResponse>),
        (status = 400, description = "Invalid scores or match not open", body = ErrorBody)
    )
)]
pub async fn report_score(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
    ValidatedJson(payload): ValidatedJson<ScoreRequest>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    report(&state, &tournament_id, match_id, Report::Score(payload.scores)).await
}

/// Complete a match and advance its players.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/winner",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    request_body = WinnerRequest,
    responses(
        (status = 200, description = "Match completed", body = Success<MatchResponse>),
        (status = 400, description = "Winner is not a player of the match", body = ErrorBody)
    )
)]
pub async fn report_winner(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
    ValidatedJson(payload): ValidatedJson<WinnerRequest>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    let outcome = Report::Winner {
        winner_id: payload.winner_id,
        scores: payload.scores,
    };
    report(&state, &tournament_id, match_id, outcome).await
}

/// Complete a match by disqualification.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/dq",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    request_body = DqRequest,
    responses(
        (status = 200, description = "Match completed", body = Success<MatchResponse>),
        (status = 400, description = "Players do not belong to the match", body = ErrorBody)
    )
)]
pub async fn disqualify(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
    ValidatedJson(payload): ValidatedJson<DqRequest>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    let outcome = Report::Disqualify {
        winner_id: payload.winner_id,
        loser_id: payload.loser_id,
    };
    report(&state, &tournament_id, match_id, outcome).await
}

/// Clear a result so the match can be replayed.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/reopen",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    responses(
        (status = 200, description = "Match reopened", body = Success<MatchResponse>),
        (status = 400, description = "A later match already started", body = ErrorBody)
    )
)]
pub async fn reopen_match(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    report(&state, &tournament_id, match_id, Report::Reopen).await
}

/// Assign a station, or clear it with `stationId: null`.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/{match_id}/station",
    tag = "matches",
    params(
        ("tournament_id" = String, Path, description = "Tournament id or url slug"),
        ("match_id" = u64, Path, description = "Match id")
    ),
    request_body = StationAssignRequest,
    responses(
        (status = 200, description = "Station assigned", body = Success<MatchResponse>),
        (status = 404, description = "Unknown match or station", body = ErrorBody),
        (status = 409, description = "Station is busy", body = ErrorBody)
    )
)]
pub async fn assign_station(
    State(state): State<SharedState>,
    Path((tournament_id, match_id)): Path<(String, u64)>,
    ValidatedJson(payload): ValidatedJson<StationAssignRequest>,
) -> Result<Json<Success<MatchResponse>>, AppError> {
    Ok(wrap(
        match_service::assign_station(&state, &tournament_id, match_id, payload.station_id)
            .await?,
    ))
}

/// Apply several score reports; each entry succeeds or fails on its own.
#[utoipa::path(
    post,
    path = "/api/matches/{tournament_id}/batch-scores",
    tag = "matches",
    params(("tournament_id" = String, Path, description = "Tournament id or url slug")),
    request_body = BatchScoresRequest,
    responses(
        (status = 200, description = "Batch outcome", body = Success<BatchScoresResponse>),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
pub async fn batch_scores(
    State(state): State<SharedState>,
    Path(tournament_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<BatchScoresRequest>,
) -> Result<Json<Success<BatchScoresResponse>>, AppError> {
    let outcome = match_service::batch_scores(&state, &tournament_id, payload).await?;
    Ok(Json(Success::new(outcome)))
}
