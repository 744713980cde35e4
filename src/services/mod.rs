/// Bracket editor: preview, seed application, shuffling and match generation.
pub mod bracket_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Realtime event names and broadcast helpers.
pub mod events;
/// Flyer images served from disk.
pub mod flyer_service;
/// Health check service.
pub mod health_service;
/// Match reporting, progression and station assignment.
pub mod match_service;
/// Participant registration and seed bookkeeping.
pub mod participant_service;
/// Station management.
pub mod station_service;
/// Polling hints and display listing.
pub mod status_service;
/// Storage connection supervisor with backoff and degraded mode.
pub mod storage_supervisor;
/// Challonge mirroring for linked tournaments.
pub mod sync_service;
/// Venue ticker messages.
pub mod ticker_service;
/// Tournament CRUD and lifecycle.
pub mod tournament_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
