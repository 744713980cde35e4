//! Stations: play areas that matches get assigned to.

use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::{IdKind, MatchEntity, StationEntity},
    dto::station::{CreateStationRequest, StationDeleted, StationDto},
    error::ServiceError,
    services::{events, match_service, tournament_service},
    state::{SharedState, match_state::{MatchState, effective_state}},
};

fn hosted<'a>(matches: &'a [MatchEntity], station_id: u64) -> Option<&'a MatchEntity> {
    matches.iter().find(|entry| {
        entry.station_id == Some(station_id) && effective_state(entry) != MatchState::Complete
    })
}

/// Stations of a tournament with the match each one currently hosts.
pub async fn list(state: &SharedState, key: &str) -> Result<Vec<StationDto>, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    let matches = store.list_matches(tournament.id).await?;
    let mut stations = store.list_stations(tournament.id).await?;
    stations.sort_by_key(|station| station.id);
    Ok(stations
        .iter()
        .map(|station| StationDto::new(station, hosted(&matches, station.id)))
        .collect())
}

/// Create a station. Names are unique per tournament, ignoring case.
pub async fn create(
    state: &SharedState,
    key: &str,
    request: CreateStationRequest,
) -> Result<StationDto, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("station name must not be blank".into()));
    }
    let existing = store.list_stations(tournament.id).await?;
    if existing
        .iter()
        .any(|station| station.name.eq_ignore_ascii_case(&name))
    {
        return Err(ServiceError::Conflict(format!(
            "station `{name}` already exists"
        )));
    }

    let station = StationEntity {
        id: store.allocate_id(IdKind::Station).await?,
        tournament_id: tournament.id,
        name,
        created_at: SystemTime::now(),
    };
    store.save_station(station.clone()).await?;
    info!(tournament_id = tournament.id, station_id = station.id, name = %station.name, "station created");

    let dto = StationDto::new(&station, None);
    events::broadcast_station_created(state, &dto);
    Ok(dto)
}

/// Delete a station and unassign the matches it held.
pub async fn delete(
    state: &SharedState,
    key: &str,
    station_id: u64,
) -> Result<StationDeleted, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    if !store.delete_station(tournament.id, station_id).await? {
        return Err(ServiceError::NotFound(format!("station {station_id}")));
    }

    let now = SystemTime::now();
    let released: Vec<MatchEntity> = store
        .list_matches(tournament.id)
        .await?
        .into_iter()
        .filter(|entry| entry.station_id == Some(station_id))
        .map(|mut entry| {
            entry.station_id = None;
            entry.updated_at = now;
            entry
        })
        .collect();
    let released_ids: Vec<u64> = released.iter().map(|entry| entry.id).collect();
    if !released.is_empty() {
        store.save_matches(released).await?;
    }
    info!(
        tournament_id = tournament.id,
        station_id,
        released = released_ids.len(),
        "station deleted"
    );

    let payload = StationDeleted {
        tournament_id: tournament.id,
        station_id,
    };
    events::broadcast_station_deleted(state, &payload);
    if !released_ids.is_empty() {
        match_service::publish(state, &store, &tournament, &released_ids).await?;
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::tournament_store::MemoryStore,
        dto::{participant::CreateParticipantRequest, tournament::CreateTournamentRequest},
        services::participant_service,
        state::AppState,
    };

    async fn started() -> SharedState {
        let state = AppState::new(AppConfig::default(), None);
        state.install_store(Arc::new(MemoryStore::new())).await;
        let request: CreateTournamentRequest =
            serde_json::from_value(serde_json::json!({"name": "Weekly", "url": "weekly"})).unwrap();
        tournament_service::create(&state, request).await.unwrap();
        for name in ["Alice", "Bob", "Carol", "Dave"] {
            let participant = CreateParticipantRequest {
                name: name.into(),
                seed: None,
                email: None,
                misc: None,
            };
            participant_service::create(&state, "weekly", participant)
                .await
                .unwrap();
        }
        tournament_service::start(&state, "weekly").await.unwrap();
        state
    }

    fn named(name: &str) -> CreateStationRequest {
        CreateStationRequest { name: name.into() }
    }

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let state = started().await;
        create(&state, "weekly", named("TV 1")).await.unwrap();
        assert!(matches!(
            create(&state, "weekly", named("tv 1")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn busy_station_rejects_second_match() {
        let state = started().await;
        let station = create(&state, "weekly", named("TV 1")).await.unwrap();
        let open: Vec<u64> = match_service::list(&state, "weekly", Default::default())
            .await
            .unwrap()
            .into_iter()
            .filter(|entry| entry.effective_state == MatchState::Open)
            .map(|entry| entry.id)
            .collect();
        assert_eq!(open.len(), 2);

        match_service::assign_station(&state, "weekly", open[0], Some(station.id))
            .await
            .unwrap();
        assert!(matches!(
            match_service::assign_station(&state, "weekly", open[1], Some(station.id)).await,
            Err(ServiceError::Conflict(_))
        ));

        let listed = list(&state, "weekly").await.unwrap();
        assert_eq!(listed[0].match_id, Some(open[0]));
    }

    #[tokio::test]
    async fn deleting_a_station_unassigns_its_match() {
        let state = started().await;
        let station = create(&state, "weekly", named("TV 1")).await.unwrap();
        let first = match_service::list(&state, "weekly", Default::default())
            .await
            .unwrap()[0]
            .id;
        match_service::assign_station(&state, "weekly", first, Some(station.id))
            .await
            .unwrap();

        delete(&state, "weekly", station.id).await.unwrap();
        let entry = match_service::get(&state, "weekly", first).await.unwrap();
        assert_eq!(entry.station_id, None);
    }
}
