//! Mirroring of Challonge-linked tournaments: forwarding writes and pulling snapshots.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use tracing::{info, warn};

use crate::{
    challonge::{Challonge, RemoteAck, RemoteOp, models::RemoteTournament},
    dao::{
        models::{IdKind, SaveOutcome, TournamentEntity, TournamentType},
        tournament_store::TournamentStore,
    },
    error::ServiceError,
    state::{SharedState, lifecycle::TournamentState},
};

/// Challonge client or [`ServiceError::RemoteDisabled`].
pub fn require_challonge(state: &SharedState) -> Result<Arc<dyn Challonge>, ServiceError> {
    state.challonge().ok_or(ServiceError::RemoteDisabled)
}

/// Forward a write for a linked tournament.
pub async fn forward(
    state: &SharedState,
    tournament: &TournamentEntity,
    op: RemoteOp,
) -> Result<RemoteAck, ServiceError> {
    let Some(remote_id) = tournament.remote_id else {
        return Err(ServiceError::Internal(format!(
            "tournament {} is not linked to Challonge",
            tournament.id
        )));
    };
    let challonge = require_challonge(state)?;
    let name = op.name();
    let ack = challonge.push(remote_id, op).await.inspect_err(|err| {
        warn!(tournament_id = tournament.id, remote_id, op = name, error = %err, "Challonge call failed");
    })?;
    info!(tournament_id = tournament.id, remote_id, op = name, "forwarded to Challonge");
    Ok(ack)
}

/// Re-pull a linked tournament and overwrite its local copy. Station assignments survive.
pub async fn pull(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    tournament: TournamentEntity,
) -> Result<TournamentEntity, ServiceError> {
    let Some(remote_id) = tournament.remote_id else {
        return Err(ServiceError::InvalidState(format!(
            "tournament `{}` is not linked to Challonge",
            tournament.url
        )));
    };
    let challonge = require_challonge(state)?;
    let remote = challonge.fetch_tournament(remote_id.to_string()).await?;
    let synced = mirror(store, tournament, remote).await?;
    info!(tournament_id = synced.id, remote_id, "tournament synced from Challonge");
    Ok(synced)
}

/// Import a Challonge tournament as a new linked tournament.
pub async fn import(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    url: &str,
) -> Result<TournamentEntity, ServiceError> {
    let challonge = require_challonge(state)?;
    let remote = challonge.fetch_tournament(url.to_owned()).await?;

    if store.find_tournament_by_url(remote.url.clone()).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "a tournament with url `{}` already exists",
            remote.url
        )));
    }

    let now = SystemTime::now();
    let mut entity = TournamentEntity {
        id: store.allocate_id(IdKind::Tournament).await?,
        url: remote.url.clone(),
        name: remote.name.clone(),
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
    };
    remote.apply_to(&mut entity);
    if !store.insert_tournament(entity.clone()).await? {
        return Err(ServiceError::Conflict(format!(
            "a tournament with url `{}` already exists",
            entity.url
        )));
    }

    let imported = mirror(store, entity, remote).await?;
    info!(
        tournament_id = imported.id,
        remote_id = imported.remote_id,
        url = %imported.url,
        "tournament imported from Challonge"
    );
    Ok(imported)
}

/// Write a remote snapshot over the local tournament, its participants and its matches.
async fn mirror(
    store: &Arc<dyn TournamentStore>,
    mut tournament: TournamentEntity,
    remote: RemoteTournament,
) -> Result<TournamentEntity, ServiceError> {
    let now = SystemTime::now();
    remote.apply_to(&mut tournament);
    tournament.synced_at = Some(now);
    tournament.updated_at = now;
    let tournament_id = tournament.id;

    let previous: HashMap<u64, _> = store
        .list_participants(tournament_id)
        .await?
        .into_iter()
        .map(|participant| (participant.id, participant))
        .collect();
    let mut kept = HashSet::with_capacity(remote.participants.len());
    for envelope in remote.participants {
        let id = envelope.participant.id;
        kept.insert(id);
        let entity = envelope
            .participant
            .into_entity(tournament_id, previous.get(&id), now);
        store.save_participant(entity).await?;
    }
    for stale in previous.keys().filter(|id| !kept.contains(id)) {
        store.delete_participant(tournament_id, *stale).await?;
    }

    let stations: HashMap<u64, u64> = store
        .list_matches(tournament_id)
        .await?
        .into_iter()
        .filter_map(|entity| entity.station_id.map(|station| (entity.id, station)))
        .collect();
    let matches = remote
        .matches
        .into_iter()
        .map(|envelope| {
            let station = stations.get(&envelope.entry.id).copied();
            envelope.entry.into_entity(tournament_id, station, now)
        })
        .collect();
    store.replace_matches(tournament_id, matches).await?;

    match store.save_tournament(tournament, None).await? {
        SaveOutcome::Saved(saved) => Ok(saved),
        SaveOutcome::Missing => Err(ServiceError::NotFound(format!("tournament {tournament_id}"))),
        SaveOutcome::Conflict { current_version } => {
            Err(ServiceError::VersionConflict { current_version })
        }
        SaveOutcome::UrlTaken => Err(ServiceError::Conflict(format!(
            "remote url of tournament {tournament_id} is used by another tournament"
        ))),
    }
}
