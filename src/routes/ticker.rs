use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::{
        Success,
        ticker::{TickerRequest, TickerResponse},
    },
    error::{AppError, ErrorBody},
    routes::extract::ValidatedJson,
    services::ticker_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new().route("/api/ticker/send", post(send_ticker))
}

/// Push a message to every connected display.
#[utoipa::path(
    post,
    path = "/api/ticker/send",
    tag = "ticker",
    request_body = TickerRequest,
    responses(
        (status = 200, description = "Message broadcast", body = Success<TickerResponse>),
        (status = 400, description = "Invalid message", body = ErrorBody)
    )
)]
pub async fn send_ticker(
    State(state): State<SharedState>,
    ValidatedJson(payload): ValidatedJson<TickerRequest>,
) -> Result<Json<Success<TickerResponse>>, AppError> {
    let ticker = ticker_service::send(&state, payload);
    Ok(Json(Success::new(TickerResponse { ticker })))
}
