use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::TournamentStore;
use crate::dao::{
    models::{
        IdKind, MatchEntity, ParticipantEntity, SaveOutcome, StationEntity, TournamentEntity,
    },
    storage::StorageResult,
};

/// Process-local [`TournamentStore`] used when no database is configured, and by tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    sequences: [AtomicU64; 4],
    data: RwLock<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    tournaments: HashMap<u64, TournamentEntity>,
    participants: HashMap<u64, ParticipantEntity>,
    matches: HashMap<u64, MatchEntity>,
    stations: HashMap<u64, StationEntity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence(&self, kind: IdKind) -> &AtomicU64 {
        let slot = match kind {
            IdKind::Tournament => 0,
            IdKind::Participant => 1,
            IdKind::Match => 2,
            IdKind::Station => 3,
        };
        &self.inner.sequences[slot]
    }
}

fn children<T: Clone>(
    records: &HashMap<u64, T>,
    tournament_id: u64,
    owner: impl Fn(&T) -> u64,
) -> Vec<T> {
    let mut found: Vec<(u64, T)> = records
        .iter()
        .filter(|(_, record)| owner(record) == tournament_id)
        .map(|(id, record)| (*id, record.clone()))
        .collect();
    found.sort_by_key(|(id, _)| *id);
    found.into_iter().map(|(_, record)| record).collect()
}

impl TournamentStore for MemoryStore {
    fn allocate_id(&self, kind: IdKind) -> BoxFuture<'static, StorageResult<u64>> {
        let id = self.sequence(kind).fetch_add(1, Ordering::Relaxed) + 1;
        Box::pin(async move { Ok(id) })
    }

    fn insert_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            if data
                .tournaments
                .values()
                .any(|existing| existing.url == tournament.url)
            {
                return Ok(false);
            }
            data.tournaments.insert(tournament.id, tournament);
            Ok(true)
        })
    }

    fn find_tournament(
        &self,
        id: u64,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(data.tournaments.get(&id).cloned())
        })
    }

    fn find_tournament_by_url(
        &self,
        url: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(data
                .tournaments
                .values()
                .find(|tournament| tournament.url == url)
                .cloned())
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(data.tournaments.values().cloned().collect())
        })
    }

    fn save_tournament(
        &self,
        mut tournament: TournamentEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<SaveOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            if data
                .tournaments
                .values()
                .any(|existing| existing.id != tournament.id && existing.url == tournament.url)
            {
                return Ok(SaveOutcome::UrlTaken);
            }
            let Some(stored) = data.tournaments.get_mut(&tournament.id) else {
                return Ok(SaveOutcome::Missing);
            };
            if let Some(expected) = expected_version {
                if stored.version != expected {
                    return Ok(SaveOutcome::Conflict {
                        current_version: stored.version,
                    });
                }
            }
            tournament.version = stored.version + 1;
            *stored = tournament.clone();
            Ok(SaveOutcome::Saved(tournament))
        })
    }

    fn delete_tournament(&self, id: u64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            let existed = data.tournaments.remove(&id).is_some();
            data.participants
                .retain(|_, participant| participant.tournament_id != id);
            data.matches.retain(|_, entity| entity.tournament_id != id);
            data.stations.retain(|_, station| station.tournament_id != id);
            Ok(existed)
        })
    }

    fn list_participants(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(children(&data.participants, tournament_id, |p| {
                p.tournament_id
            }))
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            data.participants.insert(participant.id, participant);
            Ok(())
        })
    }

    fn delete_participant(
        &self,
        tournament_id: u64,
        participant_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            let owned = data
                .participants
                .get(&participant_id)
                .is_some_and(|participant| participant.tournament_id == tournament_id);
            if owned {
                data.participants.remove(&participant_id);
            }
            Ok(owned)
        })
    }

    fn list_matches(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(children(&data.matches, tournament_id, |m| m.tournament_id))
        })
    }

    fn save_matches(&self, matches: Vec<MatchEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            for entity in matches {
                data.matches.insert(entity.id, entity);
            }
            Ok(())
        })
    }

    fn replace_matches(
        &self,
        tournament_id: u64,
        matches: Vec<MatchEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            data.matches
                .retain(|_, entity| entity.tournament_id != tournament_id);
            for entity in matches {
                data.matches.insert(entity.id, entity);
            }
            Ok(())
        })
    }

    fn list_stations(
        &self,
        tournament_id: u64,
    ) -> BoxFuture<'static, StorageResult<Vec<StationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.data.read().await;
            Ok(children(&data.stations, tournament_id, |s| s.tournament_id))
        })
    }

    fn save_station(&self, station: StationEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            data.stations.insert(station.id, station);
            Ok(())
        })
    }

    fn delete_station(
        &self,
        tournament_id: u64,
        station_id: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.data.write().await;
            let owned = data
                .stations
                .get(&station_id)
                .is_some_and(|station| station.tournament_id == tournament_id);
            if owned {
                data.stations.remove(&station_id);
            }
            Ok(owned)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{dao::models::TournamentType, state::lifecycle::TournamentState};

    fn tournament(id: u64, url: &str) -> TournamentEntity {
        let now = SystemTime::now();
        TournamentEntity {
            id,
            url: url.into(),
            name: url.into(),
            description: None,
            game_name: None,
            tournament_type: TournamentType::SingleElimination,
            state: TournamentState::Pending,
            hold_third_place_match: false,
            signup_cap: None,
            start_at: None,
            check_in_duration: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
            remote_id: None,
            synced_at: None,
        }
    }

    #[tokio::test]
    async fn sequences_are_independent() {
        let store = MemoryStore::new();
        assert_eq!(store.allocate_id(IdKind::Tournament).await.unwrap(), 1);
        assert_eq!(store.allocate_id(IdKind::Tournament).await.unwrap(), 2);
        assert_eq!(store.allocate_id(IdKind::Match).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_url_is_refused() {
        let store = MemoryStore::new();
        assert!(store.insert_tournament(tournament(1, "weekly")).await.unwrap());
        assert!(!store.insert_tournament(tournament(2, "weekly")).await.unwrap());
    }

    #[tokio::test]
    async fn compare_and_set_rejects_stale_version() {
        let store = MemoryStore::new();
        store.insert_tournament(tournament(1, "weekly")).await.unwrap();

        let first = store
            .save_tournament(tournament(1, "weekly"), Some(1))
            .await
            .unwrap();
        let SaveOutcome::Saved(saved) = first else {
            panic!("first write must win");
        };
        assert_eq!(saved.version, 2);

        let second = store
            .save_tournament(tournament(1, "weekly"), Some(1))
            .await
            .unwrap();
        assert_eq!(second, SaveOutcome::Conflict { current_version: 2 });

        let forced = store
            .save_tournament(tournament(1, "weekly"), None)
            .await
            .unwrap();
        assert!(matches!(forced, SaveOutcome::Saved(t) if t.version == 3));

        assert_eq!(
            store.save_tournament(tournament(9, "x"), None).await.unwrap(),
            SaveOutcome::Missing
        );
    }

    #[tokio::test]
    async fn renaming_onto_a_taken_url_is_refused() {
        let store = MemoryStore::new();
        store.insert_tournament(tournament(1, "weekly")).await.unwrap();
        store.insert_tournament(tournament(2, "monthly")).await.unwrap();

        let outcome = store
            .save_tournament(tournament(2, "weekly"), Some(1))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::UrlTaken);
        let kept = store.find_tournament(2).await.unwrap().unwrap();
        assert_eq!((kept.url.as_str(), kept.version), ("monthly", 1));

        let renamed = store
            .save_tournament(tournament(2, "biweekly"), Some(1))
            .await
            .unwrap();
        assert!(matches!(renamed, SaveOutcome::Saved(t) if t.url == "biweekly"));
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let store = MemoryStore::new();
        store.insert_tournament(tournament(1, "weekly")).await.unwrap();
        store
            .save_station(StationEntity {
                id: 1,
                tournament_id: 1,
                name: "TV 1".into(),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        assert!(store.delete_tournament(1).await.unwrap());
        assert!(store.list_stations(1).await.unwrap().is_empty());
        assert!(!store.delete_tournament(1).await.unwrap());
    }
}
