//! Tournament CRUD, optimistic locking and lifecycle transitions.

use std::{sync::Arc, time::SystemTime};

use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::{
    challonge::{ChallongeError, RemoteOp, models::{TournamentBody, parse_time}},
    dao::{
        models::{IdKind, SaveOutcome, TournamentEntity},
        tournament_store::TournamentStore,
    },
    dto::tournament::{
        CreateTournamentRequest, TournamentDto, TournamentListQuery, UpdateTournamentRequest,
    },
    error::ServiceError,
    services::{bracket_service, events, match_service, sync_service},
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, TournamentState},
        match_state::MatchState,
    },
};

/// Tournament loaded while holding its write gate.
pub struct LockedTournament {
    store: Arc<dyn TournamentStore>,
    tournament: TournamentEntity,
    gate: OwnedMutexGuard<()>,
}

impl LockedTournament {
    /// Store, tournament and the gate guard; keep the guard alive until the write is done.
    pub fn into_parts(self) -> (Arc<dyn TournamentStore>, TournamentEntity, OwnedMutexGuard<()>) {
        (self.store, self.tournament, self.gate)
    }
}

/// Look a tournament up by numeric id or url slug.
pub async fn find(
    store: &Arc<dyn TournamentStore>,
    key: &str,
) -> Result<TournamentEntity, ServiceError> {
    if let Ok(id) = key.parse::<u64>() {
        if let Some(tournament) = store.find_tournament(id).await? {
            return Ok(tournament);
        }
    }
    store
        .find_tournament_by_url(key.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{key}`")))
}

/// Resolve `key` and take the tournament's write gate, re-reading the record under the gate.
pub async fn lock(state: &SharedState, key: &str) -> Result<LockedTournament, ServiceError> {
    let store = state.require_store().await?;
    let found = find(&store, key).await?;
    let gate = state.lock_tournament(found.id).await;
    let tournament = store
        .find_tournament(found.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{key}`")))?;
    Ok(LockedTournament {
        store,
        tournament,
        gate,
    })
}

/// Persist a tournament written under its gate, where no concurrent edit can slip in.
pub async fn save_locked(
    store: &Arc<dyn TournamentStore>,
    tournament: TournamentEntity,
) -> Result<TournamentEntity, ServiceError> {
    let id = tournament.id;
    match store.save_tournament(tournament, None).await? {
        SaveOutcome::Saved(saved) => Ok(saved),
        SaveOutcome::Missing => Err(ServiceError::NotFound(format!("tournament {id}"))),
        SaveOutcome::Conflict { current_version } => {
            Err(ServiceError::VersionConflict { current_version })
        }
        SaveOutcome::UrlTaken => Err(ServiceError::Conflict(format!(
            "tournament {id} url is already taken"
        ))),
    }
}

pub async fn list(
    state: &SharedState,
    query: TournamentListQuery,
) -> Result<Vec<TournamentDto>, ServiceError> {
    let store = state.require_store().await?;
    let mut tournaments = store.list_tournaments().await?;
    if let Some(wanted) = query.state {
        tournaments.retain(|tournament| tournament.state == wanted);
    }
    tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(tournaments.iter().map(TournamentDto::from).collect())
}

pub async fn get(state: &SharedState, key: &str) -> Result<TournamentDto, ServiceError> {
    let store = state.require_store().await?;
    let tournament = find(&store, key).await?;
    Ok(TournamentDto::from(&tournament))
}

/// Create a local tournament in `pending` state with version 1.
pub async fn create(
    state: &SharedState,
    request: CreateTournamentRequest,
) -> Result<TournamentDto, ServiceError> {
    let store = state.require_store().await?;
    let now = SystemTime::now();
    let entity = TournamentEntity {
        id: store.allocate_id(IdKind::Tournament).await?,
        url: request.url,
        name: request.name,
        description: request.description.filter(|d| !d.is_empty()),
        game_name: request.game_name,
        tournament_type: request.tournament_type,
        state: TournamentState::Pending,
        hold_third_place_match: request.hold_third_place_match,
        signup_cap: request.signup_cap,
        start_at: parse_time(request.start_at.as_deref()),
        check_in_duration: request.check_in_duration,
        started_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
        version: 1,
        remote_id: None,
        synced_at: None,
    };

    if !store.insert_tournament(entity.clone()).await? {
        return Err(ServiceError::Conflict(format!(
            "url `{}` is already taken",
            entity.url
        )));
    }

    info!(tournament_id = entity.id, url = %entity.url, "tournament created");
    let dto = TournamentDto::from(&entity);
    events::broadcast_tournament(state, events::TOURNAMENT_CREATED, &dto);
    Ok(dto)
}

/// Edit a tournament with optimistic locking.
///
/// The version token comes from the body or, failing that, `if_match`. Without `force` the write
/// is a compare-and-set on that token.
pub async fn update(
    state: &SharedState,
    key: &str,
    request: UpdateTournamentRequest,
    if_match: Option<u64>,
) -> Result<TournamentDto, ServiceError> {
    let expected = request.expected_version.or(if_match);
    if !request.force && expected.is_none() {
        return Err(ServiceError::InvalidInput(
            "expectedVersion (or an If-Match header) is required unless force is set".into(),
        ));
    }

    let (store, mut tournament, _gate) = lock(state, key).await?.into_parts();

    if let Some(expected) = expected.filter(|_| !request.force) {
        if expected != tournament.version {
            return Err(ServiceError::VersionConflict {
                current_version: tournament.version,
            });
        }
    }

    let structural = request
        .tournament_type
        .is_some_and(|kind| kind != tournament.tournament_type)
        || request
            .hold_third_place_match
            .is_some_and(|hold| hold != tournament.hold_third_place_match);
    if structural && tournament.state != TournamentState::Pending {
        return Err(ServiceError::InvalidState(format!(
            "format can only change while the tournament is pending (currently {})",
            tournament.state.as_str()
        )));
    }

    if let Some(url) = request.url.as_ref().filter(|url| **url != tournament.url) {
        if store.find_tournament_by_url(url.clone()).await?.is_some() {
            return Err(ServiceError::Conflict(format!("url `{url}` is already taken")));
        }
    }

    apply_update(&mut tournament, &request);
    tournament.updated_at = SystemTime::now();

    if tournament.is_linked() {
        sync_service::forward(
            state,
            &tournament,
            RemoteOp::UpdateTournament(TournamentBody::from(&tournament)),
        )
        .await?;
    }

    let url = tournament.url.clone();
    let saved = match store
        .save_tournament(tournament, expected.filter(|_| !request.force))
        .await?
    {
        SaveOutcome::Saved(saved) => saved,
        SaveOutcome::Conflict { current_version } => {
            return Err(ServiceError::VersionConflict { current_version });
        }
        SaveOutcome::Missing => return Err(ServiceError::NotFound(format!("tournament `{key}`"))),
        SaveOutcome::UrlTaken => {
            return Err(ServiceError::Conflict(format!("url `{url}` is already taken")));
        }
    };

    info!(
        tournament_id = saved.id,
        version = saved.version,
        forced = request.force,
        "tournament updated"
    );
    let dto = TournamentDto::from(&saved);
    events::broadcast_tournament(state, events::TOURNAMENT_UPDATE, &dto);
    Ok(dto)
}

fn apply_update(tournament: &mut TournamentEntity, changes: &UpdateTournamentRequest) {
    if let Some(name) = &changes.name {
        tournament.name = name.clone();
    }
    if let Some(url) = &changes.url {
        tournament.url = url.clone();
    }
    if let Some(kind) = changes.tournament_type {
        tournament.tournament_type = kind;
    }
    if let Some(description) = &changes.description {
        tournament.description = description.clone().filter(|d| !d.is_empty());
    }
    if let Some(game_name) = &changes.game_name {
        tournament.game_name = game_name.clone();
    }
    if let Some(hold) = changes.hold_third_place_match {
        tournament.hold_third_place_match = hold;
    }
    if let Some(cap) = changes.signup_cap {
        tournament.signup_cap = cap;
    }
    if let Some(start_at) = &changes.start_at {
        tournament.start_at = parse_time(start_at.as_deref());
    }
    if let Some(duration) = changes.check_in_duration {
        tournament.check_in_duration = duration;
    }
}

/// Delete a tournament with everything it owns.
pub async fn delete(state: &SharedState, key: &str) -> Result<u64, ServiceError> {
    let (store, tournament, _gate) = lock(state, key).await?.into_parts();

    if tournament.is_linked() {
        match sync_service::forward(state, &tournament, RemoteOp::Delete).await {
            Ok(_) | Err(ServiceError::Remote(ChallongeError::NotFound { .. })) => {}
            Err(err) => return Err(err),
        }
    }

    if !store.delete_tournament(tournament.id).await? {
        return Err(ServiceError::NotFound(format!("tournament `{key}`")));
    }
    state.forget_tournament(tournament.id);

    info!(tournament_id = tournament.id, "tournament deleted");
    events::broadcast_tournament_deleted(state, tournament.id);
    Ok(tournament.id)
}

/// Start a pending tournament: generate its matches (or let Challonge do it) and open round 1.
pub async fn start(state: &SharedState, key: &str) -> Result<TournamentDto, ServiceError> {
    let (store, mut tournament, _gate) = lock(state, key).await?.into_parts();
    let next = tournament.state.transition(LifecycleEvent::Start)?;

    let participants = store.list_participants(tournament.id).await?;
    if participants.len() < 2 {
        return Err(ServiceError::InvalidState(format!(
            "at least 2 participants are required to start (got {})",
            participants.len()
        )));
    }

    let saved = if tournament.is_linked() {
        sync_service::forward(state, &tournament, RemoteOp::Start).await?;
        sync_service::pull(state, &store, tournament).await?
    } else {
        let matches = bracket_service::materialize(&store, &tournament, &participants).await?;
        let count = matches.len();
        store.replace_matches(tournament.id, matches).await?;
        let now = SystemTime::now();
        tournament.state = next;
        tournament.started_at = Some(now);
        tournament.completed_at = None;
        tournament.updated_at = now;
        info!(tournament_id = tournament.id, matches = count, "bracket generated");
        save_locked(&store, tournament).await?
    };

    info!(tournament_id = saved.id, "tournament started");
    let dto = TournamentDto::from(&saved);
    events::broadcast_tournament(state, events::TOURNAMENT_STARTED, &dto);
    match_service::publish(state, &store, &saved, &[]).await?;
    Ok(dto)
}

/// Discard every result and return to `pending`.
pub async fn reset(state: &SharedState, key: &str) -> Result<TournamentDto, ServiceError> {
    let (store, mut tournament, _gate) = lock(state, key).await?.into_parts();
    let next = tournament.state.transition(LifecycleEvent::Reset)?;

    let saved = if tournament.is_linked() {
        sync_service::forward(state, &tournament, RemoteOp::Reset).await?;
        sync_service::pull(state, &store, tournament).await?
    } else {
        store.replace_matches(tournament.id, Vec::new()).await?;
        tournament.state = next;
        tournament.started_at = None;
        tournament.completed_at = None;
        tournament.updated_at = SystemTime::now();
        save_locked(&store, tournament).await?
    };

    info!(tournament_id = saved.id, "tournament reset");
    let dto = TournamentDto::from(&saved);
    events::broadcast_tournament(state, events::TOURNAMENT_RESET, &dto);
    match_service::publish(state, &store, &saved, &[]).await?;
    Ok(dto)
}

/// Finalize a tournament whose matches are all complete.
pub async fn complete(state: &SharedState, key: &str) -> Result<TournamentDto, ServiceError> {
    let (store, mut tournament, _gate) = lock(state, key).await?.into_parts();

    let matches = store.list_matches(tournament.id).await?;
    let unfinished = matches
        .iter()
        .filter(|entity| entity.state != MatchState::Complete)
        .count();
    if unfinished > 0 {
        return Err(ServiceError::InvalidState(format!(
            "{unfinished} match(es) are not complete yet"
        )));
    }
    // A linked tournament may still say underway when its last result came from Challonge.
    if tournament.state == TournamentState::Underway && !matches.is_empty() {
        tournament.state = tournament
            .state
            .transition(LifecycleEvent::AllMatchesComplete)?;
    }
    let next = tournament.state.transition(LifecycleEvent::Finalize)?;

    let saved = if tournament.is_linked() {
        sync_service::forward(state, &tournament, RemoteOp::Finalize).await?;
        sync_service::pull(state, &store, tournament).await?
    } else {
        let now = SystemTime::now();
        tournament.state = next;
        tournament.completed_at = Some(now);
        tournament.updated_at = now;
        save_locked(&store, tournament).await?
    };

    info!(tournament_id = saved.id, "tournament finalized");
    let dto = TournamentDto::from(&saved);
    events::broadcast_tournament(state, events::TOURNAMENT_COMPLETED, &dto);
    Ok(dto)
}

/// Import a Challonge tournament.
pub async fn import(state: &SharedState, url: &str) -> Result<TournamentDto, ServiceError> {
    let store = state.require_store().await?;
    let imported = sync_service::import(state, &store, url).await?;
    let dto = TournamentDto::from(&imported);
    events::broadcast_tournament(state, events::TOURNAMENT_CREATED, &dto);
    if let Err(err) = match_service::publish(state, &store, &imported, &[]).await {
        warn!(tournament_id = imported.id, error = %err, "failed to broadcast imported matches");
    }
    Ok(dto)
}

/// Re-pull a linked tournament from Challonge.
pub async fn sync(state: &SharedState, key: &str) -> Result<TournamentDto, ServiceError> {
    let (store, tournament, _gate) = lock(state, key).await?.into_parts();
    sync_service::require_challonge(state)?;
    let synced = sync_service::pull(state, &store, tournament).await?;
    let dto = TournamentDto::from(&synced);
    events::broadcast_tournament(state, events::TOURNAMENT_UPDATE, &dto);
    match_service::publish(state, &store, &synced, &[]).await?;
    Ok(dto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::tournament_store::MemoryStore, state::AppState};

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default(), None);
        state.install_store(Arc::new(MemoryStore::new())).await;
        state
    }

    fn create_request(url: &str) -> CreateTournamentRequest {
        serde_json::from_value(serde_json::json!({"name": "Weekly", "url": url})).unwrap()
    }

    fn edit(name: &str, expected_version: Option<u64>, force: bool) -> UpdateTournamentRequest {
        UpdateTournamentRequest {
            name: Some(name.into()),
            expected_version,
            force,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn second_edit_with_stale_version_conflicts() {
        let state = state().await;
        let created = create(&state, create_request("weekly")).await.unwrap();
        assert_eq!(created.version, 1);

        let first = update(&state, "weekly", edit("First", Some(1), false), None)
            .await
            .unwrap();
        assert_eq!(first.version, 2);

        let second = update(&state, "weekly", edit("Second", Some(1), false), None).await;
        assert!(matches!(
            second,
            Err(ServiceError::VersionConflict { current_version: 2 })
        ));

        let forced = update(&state, "weekly", edit("Forced", None, true), None)
            .await
            .unwrap();
        assert_eq!(forced.name, "Forced");
        assert_eq!(forced.version, 3);
    }

    #[tokio::test]
    async fn version_token_is_required_without_force() {
        let state = state().await;
        create(&state, create_request("weekly")).await.unwrap();
        assert!(matches!(
            update(&state, "weekly", edit("x", None, false), None).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(
            update(&state, "weekly", edit("x", None, false), Some(1))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn duplicate_url_conflicts() {
        let state = state().await;
        create(&state, create_request("weekly")).await.unwrap();
        assert!(matches!(
            create(&state, create_request("weekly")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_renames_onto_one_url_keep_it_unique() {
        let state = state().await;
        create(&state, create_request("weekly")).await.unwrap();
        create(&state, create_request("monthly")).await.unwrap();
        let rename = |key: &'static str| {
            let state = state.clone();
            async move {
                let request = UpdateTournamentRequest {
                    url: Some("finals".into()),
                    force: true,
                    ..Default::default()
                };
                update(&state, key, request, None).await
            }
        };

        let (weekly, monthly) = tokio::join!(rename("weekly"), rename("monthly"));
        let conflicts = [&weekly, &monthly]
            .into_iter()
            .filter(|outcome| matches!(outcome, Err(ServiceError::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1);
        assert!(weekly.is_ok() || monthly.is_ok());
    }

    #[tokio::test]
    async fn start_requires_two_participants() {
        let state = state().await;
        let created = create(&state, create_request("weekly")).await.unwrap();
        let err = start(&state, &created.id.to_string()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn import_needs_challonge() {
        let state = state().await;
        assert!(matches!(
            import(&state, "friday").await,
            Err(ServiceError::RemoteDisabled)
        ));
    }
}
