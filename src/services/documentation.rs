use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for tourney-desk.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::tournaments::list_tournaments,
        crate::routes::tournaments::create_tournament,
        crate::routes::tournaments::import_tournament,
        crate::routes::tournaments::get_tournament,
        crate::routes::tournaments::update_tournament,
        crate::routes::tournaments::delete_tournament,
        crate::routes::tournaments::start_tournament,
        crate::routes::tournaments::reset_tournament,
        crate::routes::tournaments::complete_tournament,
        crate::routes::tournaments::sync_tournament,
        crate::routes::participants::list_participants,
        crate::routes::participants::create_participant,
        crate::routes::participants::update_participant,
        crate::routes::participants::delete_participant,
        crate::routes::matches::list_matches,
        crate::routes::matches::match_stats,
        crate::routes::matches::get_match,
        crate::routes::matches::mark_underway,
        crate::routes::matches::unmark_underway,
        crate::routes::matches::report_score,
        crate::routes::matches::report_winner,
        crate::routes::matches::disqualify,
        crate::routes::matches::reopen_match,
        crate::routes::matches::assign_station,
        crate::routes::matches::batch_scores,
        crate::routes::stations::list_stations,
        crate::routes::stations::create_station,
        crate::routes::stations::delete_station,
        crate::routes::bracket_editor::editor_summary,
        crate::routes::bracket_editor::preview,
        crate::routes::bracket_editor::apply_seeds,
        crate::routes::bracket_editor::randomize,
        crate::routes::flyers::list_flyers,
        crate::routes::flyers::preview_flyer,
        crate::routes::flyers::delete_flyer,
        crate::routes::ticker::send_ticker,
        crate::routes::status::status,
        crate::routes::status::list_displays,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::FieldError,
            crate::dao::models::TournamentType,
            crate::state::lifecycle::TournamentState,
            crate::state::match_state::MatchState,
            crate::dto::matches::MatchesUpdate,
            crate::dto::matches::StationAssigned,
            crate::dto::bracket::ParticipantsSeeded,
            crate::dto::ticker::TickerMessage,
            crate::dto::events::RoomRequest,
            crate::dto::events::DisplayRegister,
            crate::dto::events::DisplayEvent,
            crate::dto::events::Pong,
            crate::dto::events::SocketError,
        )
    ),
    tags(
        (name = "tournaments", description = "Tournament CRUD, lifecycle and Challonge import"),
        (name = "participants", description = "Participant registration and seeds"),
        (name = "matches", description = "Match reporting and station assignment"),
        (name = "stations", description = "Play stations"),
        (name = "bracket-editor", description = "Seed editing and bracket previews"),
        (name = "flyers", description = "Flyer images for displays"),
        (name = "ticker", description = "Ticker messages for displays"),
        (name = "status", description = "Polling hints and registered displays"),
        (name = "health", description = "Health check endpoints"),
        (name = "realtime", description = "WebSocket events for dashboards and displays"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/tournaments",
            "/api/tournament/{id}",
            "/api/participants/{tournament_id}",
            "/api/matches/{tournament_id}/{match_id}/winner",
            "/api/bracket-editor/{tournament_id}/preview",
            "/api/flyers/preview/{filename}",
            "/api/ticker/send",
            "/api/status",
            "/healthcheck",
            "/ws",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
