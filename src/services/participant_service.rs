//! Participant registration, edits and removal with seed bookkeeping.

use std::{sync::Arc, time::SystemTime};

use tracing::info;

use crate::{
    bracket::seeding,
    challonge::{RemoteOp, models::ParticipantBody},
    dao::{
        models::{IdKind, ParticipantEntity, TournamentEntity},
        tournament_store::TournamentStore,
    },
    dto::participant::{
        CreateParticipantRequest, ParticipantDeleted, ParticipantDto, UpdateParticipantRequest,
    },
    error::ServiceError,
    services::{events, sync_service, tournament_service},
    state::{SharedState, lifecycle::TournamentState},
};

fn ensure_pending(tournament: &TournamentEntity, action: &str) -> Result<(), ServiceError> {
    if tournament.state != TournamentState::Pending {
        return Err(ServiceError::InvalidState(format!(
            "cannot {action} once the tournament has started (currently {})",
            tournament.state.as_str()
        )));
    }
    Ok(())
}

fn find_participant(
    participants: &[ParticipantEntity],
    participant_id: u64,
) -> Result<&ParticipantEntity, ServiceError> {
    participants
        .iter()
        .find(|participant| participant.id == participant_id)
        .ok_or_else(|| ServiceError::NotFound(format!("participant {participant_id}")))
}

/// Persist new seeds and announce every participant that moved.
async fn save_seeds(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    participants: &[ParticipantEntity],
    seeds: Vec<(u64, u32)>,
    now: SystemTime,
) -> Result<(), ServiceError> {
    for (participant_id, seed) in seeds {
        let mut moved = find_participant(participants, participant_id)?.clone();
        moved.seed = seed;
        moved.updated_at = now;
        store.save_participant(moved.clone()).await?;
        events::broadcast_participant(state, events::PARTICIPANT_UPDATED, &ParticipantDto::from(&moved));
    }
    Ok(())
}

/// Participants in seed order.
pub async fn list(state: &SharedState, key: &str) -> Result<Vec<ParticipantDto>, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    let participants = store.list_participants(tournament.id).await?;
    Ok(seeding::by_persisted_seed(&participants)
        .into_iter()
        .map(ParticipantDto::from)
        .collect())
}

/// Register a participant. Without a seed it goes last; with one, later seeds shift down.
pub async fn create(
    state: &SharedState,
    key: &str,
    request: CreateParticipantRequest,
) -> Result<ParticipantDto, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    ensure_pending(&tournament, "add participants")?;

    let mut participants = store.list_participants(tournament.id).await?;
    if let Some(cap) = tournament.signup_cap {
        if participants.len() >= cap as usize {
            return Err(ServiceError::InvalidState(format!(
                "signup cap of {cap} participants reached"
            )));
        }
    }

    let now = SystemTime::now();
    let mut participant = ParticipantEntity {
        id: 0,
        tournament_id: tournament.id,
        name: request.name,
        seed: seeding::next_free_seed(&participants),
        email: request.email,
        misc: request.misc,
        created_at: now,
        updated_at: now,
    };

    if tournament.is_linked() {
        if let Some(seed) = request.seed {
            participant.seed = seed;
        }
        let ack = sync_service::forward(
            state,
            &tournament,
            RemoteOp::AddParticipant(ParticipantBody::from(&participant)),
        )
        .await?;
        let synced = sync_service::pull(state, &store, tournament).await?;
        let created = store
            .list_participants(synced.id)
            .await?
            .into_iter()
            .find(|p| Some(p.id) == ack.id || (ack.id.is_none() && p.name == participant.name))
            .ok_or_else(|| {
                ServiceError::Internal("Challonge did not return the new participant".into())
            })?;
        info!(tournament_id = synced.id, participant_id = created.id, "participant added");
        let dto = ParticipantDto::from(&created);
        events::broadcast_participant(state, events::PARTICIPANT_CREATED, &dto);
        return Ok(dto);
    }

    participant.id = store.allocate_id(IdKind::Participant).await?;
    store.save_participant(participant.clone()).await?;
    participants.push(participant.clone());
    info!(
        tournament_id = tournament.id,
        participant_id = participant.id,
        seed = participant.seed,
        "participant added"
    );

    if let Some(seed) = request.seed {
        let moves = seeding::reseat(&participants, participant.id, seed);
        if let Some((_, placed)) = moves.iter().find(|(id, _)| *id == participant.id) {
            participant.seed = *placed;
            store.save_participant(participant.clone()).await?;
        }
        let others: Vec<(u64, u32)> = moves
            .into_iter()
            .filter(|(id, _)| *id != participant.id)
            .collect();
        save_seeds(state, &store, &participants, others, now).await?;
    }

    let dto = ParticipantDto::from(&participant);
    events::broadcast_participant(state, events::PARTICIPANT_CREATED, &dto);
    Ok(dto)
}

/// Edit a participant. Contact fields change any time, the seed only while pending.
pub async fn update(
    state: &SharedState,
    key: &str,
    participant_id: u64,
    request: UpdateParticipantRequest,
) -> Result<ParticipantDto, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    let participants = store.list_participants(tournament.id).await?;
    let mut participant = find_participant(&participants, participant_id)?.clone();

    let reseed = request.seed.filter(|seed| *seed != participant.seed);
    if reseed.is_some() {
        ensure_pending(&tournament, "change seeds")?;
    }

    let now = SystemTime::now();
    if let Some(name) = request.name {
        participant.name = name;
    }
    if let Some(email) = request.email {
        participant.email = email;
    }
    if let Some(misc) = request.misc {
        participant.misc = misc;
    }
    participant.updated_at = now;

    if tournament.is_linked() {
        if let Some(seed) = reseed {
            participant.seed = seed;
        }
        sync_service::forward(
            state,
            &tournament,
            RemoteOp::UpdateParticipant {
                participant_id,
                body: ParticipantBody::from(&participant),
            },
        )
        .await?;
        let synced = sync_service::pull(state, &store, tournament).await?;
        let refreshed = store.list_participants(synced.id).await?;
        let updated = find_participant(&refreshed, participant_id)?;
        info!(tournament_id = synced.id, participant_id, "participant updated");
        let dto = ParticipantDto::from(updated);
        events::broadcast_participant(state, events::PARTICIPANT_UPDATED, &dto);
        return Ok(dto);
    }

    if let Some(seed) = reseed {
        let moves = seeding::reseat(&participants, participant_id, seed);
        if let Some((_, placed)) = moves.iter().find(|(id, _)| *id == participant_id) {
            participant.seed = *placed;
        }
        let others: Vec<(u64, u32)> = moves
            .into_iter()
            .filter(|(id, _)| *id != participant_id)
            .collect();
        save_seeds(state, &store, &participants, others, now).await?;
    }
    store.save_participant(participant.clone()).await?;

    info!(tournament_id = tournament.id, participant_id, seed = participant.seed, "participant updated");
    let dto = ParticipantDto::from(&participant);
    events::broadcast_participant(state, events::PARTICIPANT_UPDATED, &dto);
    Ok(dto)
}

/// Remove a participant from a pending tournament and close the gap in the seeds.
pub async fn delete(
    state: &SharedState,
    key: &str,
    participant_id: u64,
) -> Result<ParticipantDeleted, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    ensure_pending(&tournament, "remove participants")?;
    let participants = store.list_participants(tournament.id).await?;
    find_participant(&participants, participant_id)?;
    let tournament_id = tournament.id;

    if tournament.is_linked() {
        sync_service::forward(
            state,
            &tournament,
            RemoteOp::RemoveParticipant { participant_id },
        )
        .await?;
        sync_service::pull(state, &store, tournament).await?;
    } else {
        if !store.delete_participant(tournament_id, participant_id).await? {
            return Err(ServiceError::NotFound(format!("participant {participant_id}")));
        }
        let remaining: Vec<ParticipantEntity> = participants
            .into_iter()
            .filter(|participant| participant.id != participant_id)
            .collect();
        let moves = seeding::compact_seeds(&remaining);
        save_seeds(state, &store, &remaining, moves, SystemTime::now()).await?;
    }

    info!(tournament_id, participant_id, "participant removed");
    let payload = ParticipantDeleted {
        tournament_id,
        participant_id,
    };
    events::broadcast_participant_deleted(state, &payload);
    Ok(payload)
}
