//! Bracket editor: seed-ordered previews, seed application and bracket materialization.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use tracing::{info, warn};

use crate::{
    bracket::{
        engine::{self, EngineOptions, Slot},
        layout,
        seeding::{self, SeededEntrant},
    },
    challonge::{RemoteOp, models::ParticipantBody},
    dao::{
        models::{
            IdKind, MatchEntity, ParticipantEntity, Prerequisite, TournamentEntity, TournamentType,
        },
        tournament_store::TournamentStore,
    },
    dto::{
        bracket::{
            ApplySeedsRequest, ApplySeedsResponse, BracketEditorResponse, BracketPreviewResponse,
            ParticipantsSeeded, PreviewParticipant, PreviewRequest, RandomizeResponse, SeedFailure,
        },
        participant::ParticipantDto,
        tournament::TournamentDto,
    },
    error::ServiceError,
    services::{events, sync_service, tournament_service},
    state::{SharedState, lifecycle::TournamentState, match_state::MatchState},
};

fn ensure_pending(tournament: &TournamentEntity, action: &str) -> Result<(), ServiceError> {
    if tournament.state != TournamentState::Pending {
        return Err(ServiceError::InvalidState(format!(
            "cannot {action}: tournament has already started (currently {})",
            tournament.state.as_str()
        )));
    }
    Ok(())
}

fn engine_options(tournament: &TournamentEntity) -> EngineOptions {
    EngineOptions {
        third_place_match: tournament.hold_third_place_match
            && tournament.tournament_type == TournamentType::SingleElimination,
    }
}

/// Tournament summary with participants in seed order.
pub async fn summary(state: &SharedState, key: &str) -> Result<BracketEditorResponse, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    let participants = store.list_participants(tournament.id).await?;
    Ok(BracketEditorResponse {
        tournament: TournamentDto::from(&tournament),
        participants: seeding::by_persisted_seed(&participants)
            .into_iter()
            .map(ParticipantDto::from)
            .collect(),
    })
}

/// Lay out the bracket the tournament would get with the given order. Nothing is written.
pub async fn preview(
    state: &SharedState,
    key: &str,
    request: PreviewRequest,
) -> Result<BracketPreviewResponse, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    ensure_pending(&tournament, "preview the bracket")?;

    let participants = store.list_participants(tournament.id).await?;
    if participants.len() < 2 {
        return Err(ServiceError::InvalidState(format!(
            "at least 2 participants are required for a preview (got {})",
            participants.len()
        )));
    }

    let order = seeding::order_participants(&participants, request.seed_order.as_deref())?;
    let ids: Vec<u64> = order.iter().map(|entrant| entrant.participant_id).collect();
    let bracket = engine::generate(tournament.tournament_type, &ids, engine_options(&tournament))?;
    let names: HashMap<u64, String> = order
        .iter()
        .map(|entrant| (entrant.participant_id, entrant.name.clone()))
        .collect();
    let drawn = layout::render(&bracket, &names, state.config().layout());

    Ok(BracketPreviewResponse {
        tournament_type: tournament.tournament_type,
        participants: order.into_iter().map(preview_participant).collect(),
        match_count: bracket.matches.len(),
        rounds: drawn.rounds,
        width: drawn.width,
        height: drawn.height,
    })
}

fn preview_participant(entrant: SeededEntrant) -> PreviewParticipant {
    PreviewParticipant {
        id: entrant.participant_id,
        name: entrant.name,
        seed: entrant.seed,
    }
}

/// Persist seeds one participant at a time. Per-item failures are reported, not rolled back.
pub async fn apply_seeds(
    state: &SharedState,
    key: &str,
    request: ApplySeedsRequest,
) -> Result<ApplySeedsResponse, ServiceError> {
    let assignments: Vec<(u64, u32)> = request
        .seeds
        .iter()
        .map(|item| (item.participant_id, item.seed))
        .collect();
    seeding::check_assignments(&assignments)?;

    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    ensure_pending(&tournament, "change seeds")?;

    let mut participants: HashMap<u64, ParticipantEntity> = store
        .list_participants(tournament.id)
        .await?
        .into_iter()
        .map(|participant| (participant.id, participant))
        .collect();

    let mut updated = 0;
    let mut errors = Vec::new();
    for (participant_id, seed) in assignments {
        let Some(participant) = participants.get_mut(&participant_id) else {
            errors.push(SeedFailure {
                participant_id,
                error: format!("participant {participant_id} not found"),
            });
            continue;
        };
        let mut changed = participant.clone();
        changed.seed = seed;
        changed.updated_at = SystemTime::now();

        match write_seed(state, &store, &tournament, changed.clone()).await {
            Ok(()) => {
                *participant = changed;
                updated += 1;
            }
            Err(err) => {
                warn!(
                    tournament_id = tournament.id,
                    participant_id,
                    error = %err,
                    "failed to apply seed"
                );
                errors.push(SeedFailure {
                    participant_id,
                    error: err.to_string(),
                });
            }
        }
    }

    let failed = errors.len();
    info!(tournament_id = tournament.id, updated, failed, "seeds applied");
    events::broadcast_participants_seeded(
        state,
        &ParticipantsSeeded {
            tournament_id: tournament.id,
            updated,
            failed,
        },
    );
    Ok(ApplySeedsResponse {
        updated,
        failed,
        errors,
    })
}

async fn write_seed(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    tournament: &TournamentEntity,
    participant: ParticipantEntity,
) -> Result<(), ServiceError> {
    if tournament.is_linked() {
        sync_service::forward(
            state,
            tournament,
            RemoteOp::UpdateParticipant {
                participant_id: participant.id,
                body: ParticipantBody::from(&participant),
            },
        )
        .await?;
    }
    store.save_participant(participant).await?;
    Ok(())
}

/// Random order for the editor's shuffle button. Nothing is written.
pub async fn randomize(state: &SharedState, key: &str) -> Result<RandomizeResponse, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    ensure_pending(&tournament, "shuffle seeds")?;
    let participants = store.list_participants(tournament.id).await?;
    let seed_order = seeding::shuffled_order(&participants, &mut rand::rng());
    Ok(RandomizeResponse { seed_order })
}

/// Generate and number the matches of a local tournament from its persisted seeds.
pub async fn materialize(
    store: &Arc<dyn TournamentStore>,
    tournament: &TournamentEntity,
    participants: &[ParticipantEntity],
) -> Result<Vec<MatchEntity>, ServiceError> {
    let ids: Vec<u64> = seeding::by_persisted_seed(participants)
        .into_iter()
        .map(|participant| participant.id)
        .collect();
    let bracket = engine::generate(tournament.tournament_type, &ids, engine_options(tournament))?;

    let mut match_ids = Vec::with_capacity(bracket.matches.len());
    for _ in &bracket.matches {
        match_ids.push(store.allocate_id(IdKind::Match).await?);
    }

    let now = SystemTime::now();
    let resolve = |slot: Slot| -> (Option<u64>, Option<Prerequisite>) {
        match slot {
            Slot::Entrant(id) => (Some(id), None),
            Slot::Winner(index) => (
                None,
                Some(Prerequisite {
                    match_id: match_ids[index],
                    loser: false,
                }),
            ),
            Slot::Loser(index) => (
                None,
                Some(Prerequisite {
                    match_id: match_ids[index],
                    loser: true,
                }),
            ),
        }
    };

    Ok(bracket
        .matches
        .iter()
        .map(|generated| {
            let (player1_id, player1_prereq) = resolve(generated.player1);
            let (player2_id, player2_prereq) = resolve(generated.player2);
            let state = if player1_id.is_some() && player2_id.is_some() {
                MatchState::Open
            } else {
                MatchState::Pending
            };
            MatchEntity {
                id: match_ids[generated.index],
                tournament_id: tournament.id,
                identifier: generated.identifier.clone(),
                round: generated.round,
                suggested_play_order: generated.play_order,
                state,
                player1_id,
                player2_id,
                player1_prereq,
                player2_prereq,
                winner_id: None,
                loser_id: None,
                scores_csv: String::new(),
                forfeited: false,
                underway_at: None,
                station_id: None,
                completed_at: None,
                updated_at: now,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::SaveOutcome, tournament_store::MemoryStore},
        dto::bracket::SeedAssignment,
        state::AppState,
    };

    async fn seeded_state(count: u64) -> (SharedState, Arc<dyn TournamentStore>) {
        let state = AppState::new(AppConfig::default(), None);
        let store: Arc<dyn TournamentStore> = Arc::new(MemoryStore::new());
        state.install_store(store.clone()).await;
        let now = SystemTime::now();
        store
            .insert_tournament(TournamentEntity {
                id: 1,
                url: "weekly".into(),
                name: "Weekly".into(),
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
            })
            .await
            .unwrap();
        for id in 1..=count {
            store
                .save_participant(ParticipantEntity {
                    id,
                    tournament_id: 1,
                    name: format!("P{id}"),
                    seed: id as u32,
                    email: None,
                    misc: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        (state, store)
    }

    #[tokio::test]
    async fn preview_follows_custom_order() {
        let (state, store) = seeded_state(4).await;
        let response = preview(
            &state,
            "weekly",
            PreviewRequest {
                seed_order: Some(vec![3, 1]),
            },
        )
        .await
        .unwrap();
        let ids: Vec<u64> = response.participants.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
        assert_eq!(response.match_count, 3);
        assert_eq!(response.rounds[0].matches[0].player1, "P3");
        // Nothing persisted.
        assert!(store.list_matches(1).await.unwrap().is_empty());
        let seeds: Vec<u32> = store
            .list_participants(1)
            .await
            .unwrap()
            .iter()
            .map(|p| p.seed)
            .collect();
        assert_eq!(seeds, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn preview_refuses_started_tournament() {
        let (state, store) = seeded_state(4).await;
        let mut tournament = store.find_tournament(1).await.unwrap().unwrap();
        tournament.state = TournamentState::Underway;
        assert!(matches!(
            store.save_tournament(tournament, None).await.unwrap(),
            SaveOutcome::Saved(_)
        ));
        assert!(matches!(
            preview(&state, "weekly", PreviewRequest::default()).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn preview_needs_two_participants() {
        let (state, _) = seeded_state(1).await;
        assert!(matches!(
            preview(&state, "1", PreviewRequest::default()).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn apply_seeds_reports_missing_participants() {
        let (state, store) = seeded_state(2).await;
        let request = ApplySeedsRequest {
            seeds: vec![
                SeedAssignment {
                    participant_id: 2,
                    seed: 1,
                },
                SeedAssignment {
                    participant_id: 1,
                    seed: 2,
                },
                SeedAssignment {
                    participant_id: 42,
                    seed: 3,
                },
            ],
        };
        let response = apply_seeds(&state, "weekly", request).await.unwrap();
        assert_eq!(response.updated, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.errors[0].participant_id, 42);

        let participants = store.list_participants(1).await.unwrap();
        let second = participants.iter().find(|p| p.id == 2).unwrap();
        assert_eq!(second.seed, 1);
    }

    #[tokio::test]
    async fn materialized_matches_link_to_their_feeders() {
        let (_, store) = seeded_state(3).await;
        let tournament = store.find_tournament(1).await.unwrap().unwrap();
        let participants = store.list_participants(1).await.unwrap();
        let matches = materialize(&store, &tournament, &participants).await.unwrap();
        assert_eq!(matches.len(), 2);

        let open: Vec<&MatchEntity> = matches
            .iter()
            .filter(|m| m.state == MatchState::Open)
            .collect();
        assert_eq!(open.len(), 1);
        let final_match = matches
            .iter()
            .find(|m| m.state == MatchState::Pending)
            .unwrap();
        assert!(final_match.depends_on(open[0].id));
        // Seed 1 skips the first round.
        assert!(final_match.has_player(1));
    }
}
