use axum::{
    Json, Router,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::{delete, get},
};

use crate::{
    dto::{
        Success,
        flyer::{FlyerDeleted, FlyerListResponse},
    },
    error::{AppError, ErrorBody},
    services::flyer_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/flyers", get(list_flyers))
        .route("/api/flyers/preview/{filename}", get(preview_flyer))
        .route("/api/flyers/{filename}", delete(delete_flyer))
}

/// Images in the flyer directory.
#[utoipa::path(
    get,
    path = "/api/flyers",
    tag = "flyers",
    responses(
        (status = 200, description = "Flyers", body = Success<FlyerListResponse>)
    )
)]
pub async fn list_flyers(
    State(state): State<SharedState>,
) -> Result<Json<Success<FlyerListResponse>>, AppError> {
    let flyers = flyer_service::list(&state).await?;
    Ok(Json(Success::new(FlyerListResponse { flyers })))
}

/// Serve one flyer image.
#[utoipa::path(
    get,
    path = "/api/flyers/preview/{filename}",
    tag = "flyers",
    params(("filename" = String, Path, description = "Image file name")),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/*"),
        (status = 400, description = "Invalid file name", body = ErrorBody),
        (status = 404, description = "Unknown flyer", body = ErrorBody)
    )
)]
pub async fn preview_flyer(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let file = flyer_service::read(&state, &filename).await?;
    Ok((
        [(CONTENT_TYPE, file.content_type), (CACHE_CONTROL, "no-cache")],
        file.bytes,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/flyers/{filename}",
    tag = "flyers",
    params(("filename" = String, Path, description = "Image file name")),
    responses(
        (status = 200, description = "Flyer deleted", body = Success<FlyerDeleted>),
        (status = 400, description = "Invalid file name", body = ErrorBody),
        (status = 404, description = "Unknown flyer", body = ErrorBody)
    )
)]
pub async fn delete_flyer(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Json<Success<FlyerDeleted>>, AppError> {
    let deleted = flyer_service::delete(&state, &filename).await?;
    Ok(Json(Success::new(deleted)))
}
