pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::{
    IdKind, MatchEntity, ParticipantEntity, SaveOutcome, StationEntity, TournamentEntity,
};
use crate::dao::storage::StorageResult;

pub use memory::MemoryStore;

/// Abstraction over the persistence layer for tournaments and their children.
///
/// Child records are always addressed through their tournament id so a backend can shard or
/// cascade by tournament.
pub trait TournamentStore: Send + Sync {
    /// Next value of the id sequence for `kind`.
    fn allocate_id(&self, kind: IdKind) -> BoxFuture<'static, StorageResult<u64>>;

    /// Insert a new tournament. Returns `false` without writing when its url is already taken.
    fn insert_tournament(&self, tournament: TournamentEntity)
    -> BoxFuture<'static, StorageResult<bool>>;
    fn find_tournament(&self, id: u64)
    -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    fn find_tournament_by_url(
        &self,
        url: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>>;
    /// Compare-and-set write. With `expected_version` the write only happens when the stored
    /// version matches; without it the write is unconditional. Either way the stored version is
    /// incremented.
    fn save_tournament(
        &self,
        tournament: TournamentEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<SaveOutcome>>;
    /// Delete a tournament with its participants, matches and stations.
    fn delete_tournament(&self, id: u64) -> BoxFuture<'static, StorageResult<bool>>;

    fn list_participants(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_participant(
        &self,
        tournament_id: u64,
        participant_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    fn list_matches(&self, tournament_id: u64)
    -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    /// Upsert the given matches.
    fn save_matches(&self, matches: Vec<MatchEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Drop every match of the tournament and store `matches` instead.
    fn replace_matches(
        &self,
        tournament_id: u64,
        matches: Vec<MatchEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    fn list_stations(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<StationEntity>>>;
    fn save_station(&self, station: StationEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_station(
        &self,
        tournament_id: u64,
        station_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
