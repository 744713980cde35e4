/// Persisted entities and their enums.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
/// Tournament persistence: in-memory and MongoDB backends.
pub mod tournament_store;
