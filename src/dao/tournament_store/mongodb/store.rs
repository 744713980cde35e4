use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoMatchDocument, MongoParticipantDocument, MongoSequenceDocument,
        MongoStationDocument, MongoTournamentDocument, bson_id, doc_id, owned_by,
    },
};
use crate::dao::{
    models::{
        IdKind, MatchEntity, ParticipantEntity, SaveOutcome, StationEntity, TournamentEntity,
    },
    storage::StorageResult,
    tournament_store::TournamentStore,
};

const TOURNAMENTS: &str = "tournaments";
const PARTICIPANTS: &str = "participants";
const MATCHES: &str = "matches";
const STATIONS: &str = "stations";
const SEQUENCES: &str = "sequences";

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

/// MongoDB-backed [`TournamentStore`] implementation.
#[derive(Clone)]
pub struct MongoTournamentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = self.config.open().await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoTournamentStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = config.open().await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let url_index = IndexModel::builder()
            .keys(doc! { "url": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("tournament_url_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(TOURNAMENTS)
            .create_index(url_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TOURNAMENTS,
                index: "url",
                source,
            })?;

        for collection in [PARTICIPANTS, MATCHES, STATIONS] {
            let index = IndexModel::builder()
                .keys(doc! { "tournament_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection}_tournament_idx")))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: "tournament_id",
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn next_id(&self, kind: IdKind) -> MongoResult<u64> {
        let sequence = kind.sequence_name();
        let sequences = self
            .collection::<MongoSequenceDocument>(SEQUENCES)
            .await;
        let updated = sequences
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "value": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Sequence { sequence, source })?;

        let value = updated.map_or(1, |document| document.value);
        u64::try_from(value).map_err(|_| MongoDaoError::Decode {
            record: format!("{SEQUENCES}/{sequence}"),
            message: format!("negative sequence value {value}"),
        })
    }

    async fn find_all<D, E>(&self, name: &'static str, filter: Document) -> MongoResult<Vec<E>>
    where
        D: DeserializeOwned + Send + Sync,
        E: TryFrom<D, Error = MongoDaoError>,
    {
        let documents: Vec<D> = self
            .collection::<D>(name)
            .await
            .find(filter)
            .await
            .map_err(MongoDaoError::query("list", name))?
            .try_collect()
            .await
            .map_err(MongoDaoError::query("list", name))?;

        documents.into_iter().map(E::try_from).collect()
    }

    async fn upsert<D>(&self, name: &'static str, id: u64, document: D) -> MongoResult<()>
    where
        D: Serialize + Send + Sync,
    {
        self.collection::<D>(name)
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(MongoDaoError::query("save", name))?;
        Ok(())
    }

    async fn delete_owned(
        &self,
        name: &'static str,
        tournament_id: u64,
        id: u64,
    ) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("tournament_id", bson_id(tournament_id));
        let result = self
            .collection::<Document>(name)
            .await
            .delete_one(filter)
            .await
            .map_err(MongoDaoError::query("delete", name))?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_tournament(&self, tournament: TournamentEntity) -> MongoResult<bool> {
        let collection = self
            .collection::<MongoTournamentDocument>(TOURNAMENTS)
            .await;
        let taken = collection
            .find_one(doc! { "url": tournament.url.as_str() })
            .await
            .map_err(MongoDaoError::query("find", TOURNAMENTS))?
            .is_some();
        if taken {
            return Ok(false);
        }

        let document: MongoTournamentDocument = tournament.into();
        collection
            .insert_one(&document)
            .await
            .map_err(MongoDaoError::query("insert", TOURNAMENTS))?;
        Ok(true)
    }

    async fn find_tournament(&self, filter: Document) -> MongoResult<Option<TournamentEntity>> {
        self.collection::<MongoTournamentDocument>(TOURNAMENTS)
            .await
            .find_one(filter)
            .await
            .map_err(MongoDaoError::query("find", TOURNAMENTS))?
            .map(TournamentEntity::try_from)
            .transpose()
    }

    async fn save_tournament(
        &self,
        mut tournament: TournamentEntity,
        expected_version: Option<u64>,
    ) -> MongoResult<SaveOutcome> {
        let Some(current) = self.find_tournament(doc_id(tournament.id)).await? else {
            return Ok(SaveOutcome::Missing);
        };
        let expected = expected_version.unwrap_or(current.version);
        if current.version != expected {
            return Ok(SaveOutcome::Conflict {
                current_version: current.version,
            });
        }

        let collection = self
            .collection::<MongoTournamentDocument>(TOURNAMENTS)
            .await;
        if tournament.url != current.url {
            let taken = collection
                .find_one(doc! {
                    "url": tournament.url.as_str(),
                    "_id": { "$ne": bson_id(tournament.id) },
                })
                .await
                .map_err(MongoDaoError::query("find", TOURNAMENTS))?
                .is_some();
            if taken {
                return Ok(SaveOutcome::UrlTaken);
            }
        }

        tournament.version = expected + 1;
        let mut filter = doc_id(tournament.id);
        filter.insert("version", expected as i64);
        let document: MongoTournamentDocument = tournament.clone().into();
        // The unique url index still catches a rename racing with another tournament.
        let result = match collection.replace_one(filter, &document).await {
            Ok(result) => result,
            Err(err) if is_duplicate_key(&err) => return Ok(SaveOutcome::UrlTaken),
            Err(err) => return Err(MongoDaoError::query("save", TOURNAMENTS)(err)),
        };

        if result.matched_count == 0 {
            // Someone else wrote between the read and the replace.
            return Ok(match self.find_tournament(doc_id(tournament.id)).await? {
                Some(latest) => SaveOutcome::Conflict {
                    current_version: latest.version,
                },
                None => SaveOutcome::Missing,
            });
        }

        Ok(SaveOutcome::Saved(tournament))
    }

    async fn delete_tournament(&self, id: u64) -> MongoResult<bool> {
        for name in [PARTICIPANTS, MATCHES, STATIONS] {
            self.collection::<Document>(name)
                .await
                .delete_many(owned_by(id))
                .await
                .map_err(MongoDaoError::query("delete", name))?;
        }
        let result = self
            .collection::<Document>(TOURNAMENTS)
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(MongoDaoError::query("delete", TOURNAMENTS))?;
        Ok(result.deleted_count > 0)
    }

    async fn save_matches(&self, matches: Vec<MatchEntity>) -> MongoResult<()> {
        for entity in matches {
            let id = entity.id;
            self.upsert(MATCHES, id, MongoMatchDocument::from(entity))
                .await?;
        }
        Ok(())
    }

    async fn replace_matches(
        &self,
        tournament_id: u64,
        matches: Vec<MatchEntity>,
    ) -> MongoResult<()> {
        let collection = self.collection::<MongoMatchDocument>(MATCHES).await;
        collection
            .delete_many(owned_by(tournament_id))
            .await
            .map_err(MongoDaoError::query("delete", MATCHES))?;

        if matches.is_empty() {
            return Ok(());
        }
        let documents: Vec<MongoMatchDocument> = matches.into_iter().map(Into::into).collect();
        collection
            .insert_many(&documents)
            .await
            .map_err(MongoDaoError::query("insert", MATCHES))?;
        Ok(())
    }
}

impl TournamentStore for MongoTournamentStore {
    fn allocate_id(&self, kind: IdKind) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.next_id(kind).await.map_err(Into::into) })
    }

    fn insert_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_tournament(tournament).await.map_err(Into::into) })
    }

    fn find_tournament(
        &self,
        id: u64,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_tournament(doc_id(id)).await.map_err(Into::into) })
    }

    fn find_tournament_by_url(
        &self,
        url: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_tournament(doc! { "url": url })
                .await
                .map_err(Into::into)
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoTournamentDocument, _>(TOURNAMENTS, doc! {})
                .await
                .map_err(Into::into)
        })
    }

    fn save_tournament(
        &self,
        tournament: TournamentEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<SaveOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_tournament(tournament, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_tournament(&self, id: u64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_tournament(id).await.map_err(Into::into) })
    }

    fn list_participants(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoParticipantDocument, _>(PARTICIPANTS, owned_by(tournament_id))
                .await
                .map_err(Into::into)
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = participant.id;
            store
                .upsert(PARTICIPANTS, id, MongoParticipantDocument::from(participant))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_participant(
        &self,
        tournament_id: u64,
        participant_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_owned(PARTICIPANTS, tournament_id, participant_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_matches(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoMatchDocument, _>(MATCHES, owned_by(tournament_id))
                .await
                .map_err(Into::into)
        })
    }

    fn save_matches(&self, matches: Vec<MatchEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_matches(matches).await.map_err(Into::into) })
    }

    fn replace_matches(
        &self,
        tournament_id: u64,
        matches: Vec<MatchEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_matches(tournament_id, matches)
                .await
                .map_err(Into::into)
        })
    }

    fn list_stations(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<StationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<MongoStationDocument, _>(STATIONS, owned_by(tournament_id))
                .await
                .map_err(Into::into)
        })
    }

    fn save_station(&self, station: StationEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = station.id;
            store
                .upsert(STATIONS, id, MongoStationDocument::from(station))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_station(
        &self,
        tournament_id: u64,
        station_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_owned(STATIONS, tournament_id, station_id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_bson() {
        assert_eq!(bson_id(42), 42_i64);
        let filter = doc_id(7);
        assert_eq!(filter.get_i64("_id").unwrap(), 7);
    }
}
