use axum::Router;

use crate::state::SharedState;

pub mod bracket_editor;
pub mod docs;
pub mod extract;
pub mod flyers;
pub mod health;
pub mod matches;
pub mod participants;
pub mod stations;
pub mod status;
pub mod ticker;
pub mod tournaments;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(tournaments::router())
        .merge(participants::router())
        .merge(matches::router())
        .merge(stations::router())
        .merge(bracket_editor::router())
        .merge(flyers::router())
        .merge(ticker::router())
        .merge(status::router())
        .merge(websocket::router());

    api_router.merge(docs::router()).with_state(state)
}
