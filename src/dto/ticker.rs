use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Message scrolled on venue displays.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TickerRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub message: String,
    /// Seconds on screen, 5 when omitted.
    #[validate(range(min = 3, max = 60, message = "must be between 3 and 60 seconds"))]
    pub duration: Option<u32>,
}

/// Payload of the `ticker:message` event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TickerMessage {
    pub message: String,
    pub duration: u32,
    pub sent_at: String,
}

/// `{"ticker": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct TickerResponse {
    pub ticker: TickerMessage,
}
