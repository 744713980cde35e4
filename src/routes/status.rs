use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{
        Success,
        status::{DisplayListResponse, StatusResponse},
    },
    services::status_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/displays", get(list_displays))
}

/// Polling intervals and connection counters for clients without a socket.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "status",
    responses(
        (status = 200, description = "Service status", body = Success<StatusResponse>)
    )
)]
pub async fn status(State(state): State<SharedState>) -> Json<Success<StatusResponse>> {
    Json(Success::new(status_service::status(&state).await))
}

/// Displays currently registered over the socket.
#[utoipa::path(
    get,
    path = "/api/displays",
    tag = "status",
    responses(
        (status = 200, description = "Displays", body = Success<DisplayListResponse>)
    )
)]
pub async fn list_displays(State(state): State<SharedState>) -> Json<Success<DisplayListResponse>> {
    let displays = status_service::displays(&state);
    Json(Success::new(DisplayListResponse { displays }))
}
