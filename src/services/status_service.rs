use crate::{
    dto::{
        format_system_time,
        status::{
            DisplayDto, MatchModule, MatchModuleState, StatusModules, StatusResponse,
        },
    },
    error::ServiceError,
    state::{SharedState, lifecycle::TournamentState},
};

/// Polling hints and connection counters.
///
/// Works in degraded mode too; the active tournament is then unknown.
pub async fn status(state: &SharedState) -> StatusResponse {
    let active_tournament_id = active_tournament(state).await.ok().flatten();
    StatusResponse {
        degraded: state.is_degraded(),
        challonge_configured: state.challonge().is_some(),
        connected_interval_ms: state.config().connected_poll().as_millis() as u64,
        disconnected_interval_ms: state.config().disconnected_poll().as_millis() as u64,
        sockets: state.socket_count(),
        displays: state.displays().len(),
        active_tournament_id,
        modules: StatusModules {
            match_module: MatchModule {
                state: MatchModuleState {
                    tournament_id: active_tournament_id,
                },
            },
        },
    }
}

/// Most recently started tournament that is still underway.
pub async fn active_tournament(state: &SharedState) -> Result<Option<u64>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store
        .list_tournaments()
        .await?
        .into_iter()
        .filter(|tournament| tournament.state == TournamentState::Underway)
        .max_by_key(|tournament| (tournament.started_at, tournament.id))
        .map(|tournament| tournament.id))
}

/// Registered displays, oldest first.
pub fn displays(state: &SharedState) -> Vec<DisplayDto> {
    let mut displays: Vec<_> = state
        .displays()
        .iter()
        .map(|entry| (entry.connected_at, entry.display_id.clone(), entry.display_type.clone()))
        .collect();
    displays.sort();
    displays
        .into_iter()
        .map(|(connected_at, display_id, display_type)| DisplayDto {
            display_id,
            display_type,
            connected_at: format_system_time(connected_at),
        })
        .collect()
}
