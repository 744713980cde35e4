use serde::Serialize;
use utoipa::ToSchema;

/// Flyer image available to displays.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlyerDto {
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    pub modified_at: Option<String>,
    /// Path serving the image.
    pub url: String,
}

/// `{"flyers": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct FlyerListResponse {
    pub flyers: Vec<FlyerDto>,
}

/// `{"filename": "..."}`, also the `flyer:deleted` payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlyerDeleted {
    pub filename: String,
}
