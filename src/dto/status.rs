use serde::Serialize;
use utoipa::ToSchema;

/// Connection hints and counters for dashboards and displays.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub degraded: bool,
    pub challonge_configured: bool,
    /// Polling interval while the socket is connected.
    pub connected_interval_ms: u64,
    /// Polling interval while the socket is down.
    pub disconnected_interval_ms: u64,
    pub sockets: usize,
    pub displays: usize,
    /// Most recently started tournament that is still underway.
    pub active_tournament_id: Option<u64>,
    pub modules: StatusModules,
}

/// Per-module state, in the shape display clients poll.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusModules {
    #[serde(rename = "match")]
    pub match_module: MatchModule,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatchModule {
    pub state: MatchModuleState,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchModuleState {
    pub tournament_id: Option<u64>,
}

/// Registered display.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDto {
    pub display_id: String,
    pub display_type: String,
    pub connected_at: String,
}

/// `{"displays": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct DisplayListResponse {
    pub displays: Vec<DisplayDto>,
}
