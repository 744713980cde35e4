//! Match listing, result reporting, progression and station assignment.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use tracing::{info, warn};

use crate::{
    bracket::{engine::BracketSide, layout},
    challonge::RemoteOp,
    dao::{
        models::{MatchEntity, TournamentEntity, TournamentType},
        tournament_store::TournamentStore,
    },
    dto::{
        matches::{
            BatchItemError, BatchScoresRequest, BatchScoresResponse, MatchDto, MatchListQuery,
            MatchStats, MatchesUpdate, StationAssigned,
        },
        tournament::TournamentDto,
    },
    error::ServiceError,
    services::{events, sync_service, tournament_service},
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, TournamentState},
        match_state::{MatchState, effective_state},
    },
};

/// Result report applied to one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    MarkUnderway,
    UnmarkUnderway,
    Score(String),
    Winner { winner_id: u64, scores: String },
    Disqualify { winner_id: u64, loser_id: u64 },
    Reopen,
}

impl Report {
    fn name(&self) -> &'static str {
        match self {
            Report::MarkUnderway => "mark_underway",
            Report::UnmarkUnderway => "unmark_underway",
            Report::Score(_) => "score",
            Report::Winner { .. } => "winner",
            Report::Disqualify { .. } => "disqualify",
            Report::Reopen => "reopen",
        }
    }
}

/// Side of a stored match, inferred from its round and its feeders.
fn side_of(format: TournamentType, entry: &MatchEntity, top_round: i32) -> BracketSide {
    match format {
        TournamentType::RoundRobin => BracketSide::RoundRobin,
        _ if entry.round < 0 => BracketSide::Losers,
        TournamentType::DoubleElimination if entry.round == top_round => BracketSide::GrandFinal,
        _ => {
            let from_losers = [entry.player1_prereq, entry.player2_prereq]
                .iter()
                .all(|prereq| prereq.is_some_and(|p| p.loser));
            if from_losers && entry.round == top_round {
                BracketSide::ThirdPlace
            } else {
                BracketSide::Winners
            }
        }
    }
}

/// Round names keyed by match id.
fn round_names(format: TournamentType, matches: &[MatchEntity]) -> HashMap<u64, String> {
    let top_round = matches.iter().map(|m| m.round).max().unwrap_or(0);
    let losers_final = matches.iter().map(|m| m.round).filter(|r| *r < 0).min();
    let winners_rounds = match format {
        TournamentType::DoubleElimination => top_round - 1,
        _ => top_round,
    }
    .max(0) as u32;
    matches
        .iter()
        .map(|entry| {
            let side = side_of(format, entry, top_round);
            let name = layout::round_label(format, side, entry.round, winners_rounds, losers_final);
            (entry.id, name)
        })
        .collect()
}

fn sort_for_display(matches: &mut [MatchDto]) {
    matches.sort_by_key(|entry| {
        (
            entry.effective_state.display_priority(),
            entry.round.unsigned_abs(),
            entry.suggested_play_order,
            entry.id,
        )
    });
}

/// Every match of `tournament`, enriched and in display order.
async fn views(
    store: &Arc<dyn TournamentStore>,
    tournament: &TournamentEntity,
) -> Result<Vec<MatchDto>, ServiceError> {
    let matches = store.list_matches(tournament.id).await?;
    let players: HashMap<u64, String> = store
        .list_participants(tournament.id)
        .await?
        .into_iter()
        .map(|participant| (participant.id, participant.name))
        .collect();
    let stations: HashMap<u64, String> = store
        .list_stations(tournament.id)
        .await?
        .into_iter()
        .map(|station| (station.id, station.name))
        .collect();
    let mut names = round_names(tournament.tournament_type, &matches);

    let mut dtos: Vec<MatchDto> = matches
        .iter()
        .map(|entry| {
            let round_name = names.remove(&entry.id).unwrap_or_default();
            MatchDto::build(entry, round_name, &players, &stations)
        })
        .collect();
    sort_for_display(&mut dtos);
    Ok(dtos)
}

/// Broadcast `match:updated` for each changed match and the full `matches:update`, returning
/// the changed matches.
pub async fn publish(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    tournament: &TournamentEntity,
    changed: &[u64],
) -> Result<Vec<MatchDto>, ServiceError> {
    let matches = views(store, tournament).await?;
    let updated: Vec<MatchDto> = matches
        .iter()
        .filter(|entry| changed.contains(&entry.id))
        .cloned()
        .collect();
    for entry in &updated {
        events::broadcast_match_updated(state, entry);
    }
    events::broadcast_matches_update(
        state,
        &MatchesUpdate {
            tournament_id: tournament.id,
            stats: MatchStats::tally(&matches),
            matches,
        },
    );
    Ok(updated)
}

pub async fn list(
    state: &SharedState,
    key: &str,
    query: MatchListQuery,
) -> Result<Vec<MatchDto>, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    let mut matches = views(&store, &tournament).await?;
    if let Some(wanted) = query.state {
        matches.retain(|entry| entry.effective_state == wanted);
    }
    if let Some(station_id) = query.station_id {
        matches.retain(|entry| entry.station_id == Some(station_id));
    }
    Ok(matches)
}

pub async fn get(state: &SharedState, key: &str, match_id: u64) -> Result<MatchDto, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    views(&store, &tournament)
        .await?
        .into_iter()
        .find(|entry| entry.id == match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))
}

pub async fn stats(state: &SharedState, key: &str) -> Result<MatchStats, ServiceError> {
    let store = state.require_store().await?;
    let tournament = tournament_service::find(&store, key).await?;
    Ok(MatchStats::tally(&views(&store, &tournament).await?))
}

/// Current `matches:update` payload of a tournament, sent to sockets that ask for it.
pub async fn snapshot(state: &SharedState, tournament_id: u64) -> Result<MatchesUpdate, ServiceError> {
    let store = state.require_store().await?;
    let tournament = store
        .find_tournament(tournament_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament {tournament_id}")))?;
    let matches = views(&store, &tournament).await?;
    Ok(MatchesUpdate {
        tournament_id,
        stats: MatchStats::tally(&matches),
        matches,
    })
}

/// Apply a report to one match and broadcast the outcome.
pub async fn report(
    state: &SharedState,
    key: &str,
    match_id: u64,
    report: Report,
) -> Result<MatchDto, ServiceError> {
    let (store, mut tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    let before = tournament.state;
    let changed = apply_locked(state, &store, &mut tournament, match_id, &report).await?;
    info!(
        tournament_id = tournament.id,
        match_id,
        report = report.name(),
        "match reported"
    );

    announce_state_change(state, &tournament, before);
    publish(state, &store, &tournament, &changed)
        .await?
        .into_iter()
        .find(|entry| entry.id == match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))
}

/// Apply several score reports independently. Failures are collected, nothing is rolled back.
pub async fn batch_scores(
    state: &SharedState,
    key: &str,
    request: BatchScoresRequest,
) -> Result<BatchScoresResponse, ServiceError> {
    let (store, mut tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    let before = tournament.state;

    let total = request.scores.len();
    let mut changed = Vec::new();
    let mut errors = Vec::new();
    for item in request.scores {
        let report = match item.winner_id {
            Some(winner_id) => Report::Winner {
                winner_id,
                scores: item.scores,
            },
            None => Report::Score(item.scores),
        };
        match apply_locked(state, &store, &mut tournament, item.match_id, &report).await {
            Ok(ids) => changed.extend(ids),
            Err(err) => {
                warn!(
                    tournament_id = tournament.id,
                    match_id = item.match_id,
                    error = %err,
                    "batch score entry failed"
                );
                errors.push(BatchItemError {
                    match_id: item.match_id,
                    error: err.to_string(),
                });
            }
        }
    }

    let failed = errors.len();
    let succeeded = total - failed;
    info!(tournament_id = tournament.id, succeeded, failed, "batch scores applied");

    changed.sort_unstable();
    changed.dedup();
    announce_state_change(state, &tournament, before);
    publish(state, &store, &tournament, &changed).await?;
    Ok(BatchScoresResponse {
        succeeded,
        failed,
        errors,
    })
}

fn announce_state_change(state: &SharedState, tournament: &TournamentEntity, before: TournamentState) {
    if tournament.state != before {
        info!(
            tournament_id = tournament.id,
            from = before.as_str(),
            to = tournament.state.as_str(),
            "tournament state changed by match report"
        );
        events::broadcast_tournament(
            state,
            events::TOURNAMENT_UPDATE,
            &TournamentDto::from(tournament),
        );
    }
}

fn ensure_reportable(tournament: &TournamentEntity, report: &Report) -> Result<(), ServiceError> {
    let allowed = match report {
        Report::Reopen => matches!(
            tournament.state,
            TournamentState::Underway | TournamentState::AwaitingReview
        ),
        _ => tournament.state.accepts_results(),
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "matches cannot be reported while the tournament is {}",
            tournament.state.as_str()
        )))
    }
}

/// Apply `report` under the tournament gate, returning the ids of every match it changed.
///
/// Local tournaments progress in place; linked ones validate against the local copy, forward
/// to Challonge and re-pull.
async fn apply_locked(
    state: &SharedState,
    store: &Arc<dyn TournamentStore>,
    tournament: &mut TournamentEntity,
    match_id: u64,
    report: &Report,
) -> Result<Vec<u64>, ServiceError> {
    ensure_reportable(tournament, report)?;
    let mut matches = store.list_matches(tournament.id).await?;
    let now = SystemTime::now();
    let changed = apply(&mut matches, match_id, report, now)?;

    if tournament.is_linked() {
        let entry = find_match(&matches, match_id)?;
        let op = match report {
            Report::MarkUnderway => RemoteOp::MarkUnderway { match_id },
            Report::UnmarkUnderway => RemoteOp::UnmarkUnderway { match_id },
            Report::Reopen => RemoteOp::ReopenMatch { match_id },
            Report::Score(_) | Report::Winner { .. } | Report::Disqualify { .. } => {
                RemoteOp::UpdateMatch {
                    match_id,
                    scores_csv: entry.scores_csv.clone(),
                    winner_id: entry.winner_id,
                }
            }
        };
        sync_service::forward(state, tournament, op).await?;
        *tournament = sync_service::pull(state, store, tournament.clone()).await?;
        // Challonge may have advanced any match; report them all as changed.
        return Ok(store
            .list_matches(tournament.id)
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect());
    }

    let changed_set: HashSet<u64> = changed.iter().copied().collect();
    let dirty: Vec<MatchEntity> = matches
        .iter()
        .filter(|entry| changed_set.contains(&entry.id))
        .cloned()
        .collect();
    store.save_matches(dirty).await?;

    let event = match report {
        Report::Reopen if tournament.state == TournamentState::AwaitingReview => {
            Some(LifecycleEvent::MatchReopened)
        }
        Report::Winner { .. } | Report::Disqualify { .. }
            if tournament.state == TournamentState::Underway
                && matches.iter().all(|entry| entry.state == MatchState::Complete) =>
        {
            Some(LifecycleEvent::AllMatchesComplete)
        }
        _ => None,
    };
    if let Some(event) = event {
        let mut next = tournament.clone();
        next.state = tournament.state.transition(event)?;
        next.updated_at = now;
        *tournament = tournament_service::save_locked(store, next).await?;
    }
    Ok(changed)
}

fn find_match(matches: &[MatchEntity], match_id: u64) -> Result<&MatchEntity, ServiceError> {
    matches
        .iter()
        .find(|entry| entry.id == match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))
}

fn position(matches: &[MatchEntity], match_id: u64) -> Result<usize, ServiceError> {
    matches
        .iter()
        .position(|entry| entry.id == match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))
}

fn not_playable(entry: &MatchEntity, action: &str) -> ServiceError {
    ServiceError::InvalidState(format!(
        "cannot {action} match {}: it is {}",
        entry.identifier,
        effective_state(entry).as_str()
    ))
}

/// Apply `report` to the in-memory match list and return the ids of the matches it touched.
fn apply(
    matches: &mut [MatchEntity],
    match_id: u64,
    report: &Report,
    now: SystemTime,
) -> Result<Vec<u64>, ServiceError> {
    let index = position(matches, match_id)?;
    match report {
        Report::MarkUnderway => {
            let entry = &mut matches[index];
            if effective_state(entry) != MatchState::Open {
                return Err(not_playable(entry, "start"));
            }
            entry.underway_at = Some(now);
            entry.updated_at = now;
            Ok(vec![match_id])
        }
        Report::UnmarkUnderway => {
            let entry = &mut matches[index];
            if effective_state(entry) != MatchState::Underway {
                return Err(not_playable(entry, "unmark"));
            }
            entry.underway_at = None;
            if entry.state == MatchState::Underway {
                entry.state = MatchState::Open;
            }
            entry.updated_at = now;
            Ok(vec![match_id])
        }
        Report::Score(scores) => {
            let entry = &mut matches[index];
            if !is_playable(entry) {
                return Err(not_playable(entry, "score"));
            }
            entry.scores_csv = scores.clone();
            entry.updated_at = now;
            Ok(vec![match_id])
        }
        Report::Winner { winner_id, scores } => {
            let entry = &matches[index];
            if !is_playable(entry) {
                return Err(not_playable(entry, "complete"));
            }
            let loser_id = opponent(entry, *winner_id)?;
            complete(matches, index, *winner_id, loser_id, scores.clone(), false, now)
        }
        Report::Disqualify {
            winner_id,
            loser_id,
        } => {
            let entry = &matches[index];
            if !is_playable(entry) {
                return Err(not_playable(entry, "disqualify in"));
            }
            if opponent(entry, *winner_id)? != *loser_id {
                return Err(ServiceError::InvalidInput(format!(
                    "participant {loser_id} does not play in match {}",
                    entry.identifier
                )));
            }
            let scores = if entry.scores_csv.is_empty() {
                "0-0".to_owned()
            } else {
                entry.scores_csv.clone()
            };
            complete(matches, index, *winner_id, *loser_id, scores, true, now)
        }
        Report::Reopen => reopen(matches, index, now),
    }
}

fn is_playable(entry: &MatchEntity) -> bool {
    matches!(
        effective_state(entry),
        MatchState::Open | MatchState::Underway
    )
}

/// The other player of `entry`, or an error when `player_id` does not play in it.
fn opponent(entry: &MatchEntity, player_id: u64) -> Result<u64, ServiceError> {
    match (entry.player1_id, entry.player2_id) {
        (Some(p1), Some(p2)) if p1 == player_id => Ok(p2),
        (Some(p1), Some(p2)) if p2 == player_id => Ok(p1),
        _ => Err(ServiceError::InvalidInput(format!(
            "participant {player_id} does not play in match {}",
            entry.identifier
        ))),
    }
}

/// Record the result and push winner and loser into the matches they feed.
fn complete(
    matches: &mut [MatchEntity],
    index: usize,
    winner_id: u64,
    loser_id: u64,
    scores: String,
    forfeited: bool,
    now: SystemTime,
) -> Result<Vec<u64>, ServiceError> {
    let entry = &mut matches[index];
    entry.state = MatchState::Complete;
    entry.winner_id = Some(winner_id);
    entry.loser_id = Some(loser_id);
    entry.scores_csv = scores;
    entry.forfeited = forfeited;
    entry.underway_at = None;
    entry.station_id = None;
    entry.completed_at = Some(now);
    entry.updated_at = now;
    let match_id = entry.id;

    let mut changed = vec![match_id];
    for dependent in matches.iter_mut().filter(|m| m.depends_on(match_id)) {
        for (slot, prereq) in [
            (&mut dependent.player1_id, dependent.player1_prereq),
            (&mut dependent.player2_id, dependent.player2_prereq),
        ] {
            if let Some(prereq) = prereq.filter(|p| p.match_id == match_id) {
                *slot = Some(if prereq.loser { loser_id } else { winner_id });
            }
        }
        if dependent.state == MatchState::Pending
            && dependent.player1_id.is_some()
            && dependent.player2_id.is_some()
        {
            dependent.state = MatchState::Open;
        }
        dependent.updated_at = now;
        changed.push(dependent.id);
    }
    Ok(changed)
}

/// Undo a result. Refused once a dependent match has started; otherwise the slots it filled
/// are emptied again.
fn reopen(
    matches: &mut [MatchEntity],
    index: usize,
    now: SystemTime,
) -> Result<Vec<u64>, ServiceError> {
    let match_id = matches[index].id;
    if matches[index].state != MatchState::Complete {
        return Err(not_playable(&matches[index], "reopen"));
    }
    if let Some(blocking) = matches.iter().find(|m| {
        m.depends_on(match_id)
            && matches!(
                effective_state(m),
                MatchState::Underway | MatchState::Complete
            )
    }) {
        return Err(ServiceError::InvalidState(format!(
            "match {} depends on this result and is already {}",
            blocking.identifier,
            effective_state(blocking).as_str()
        )));
    }

    let entry = &mut matches[index];
    entry.state = MatchState::Open;
    entry.winner_id = None;
    entry.loser_id = None;
    entry.forfeited = false;
    entry.completed_at = None;
    entry.updated_at = now;

    let mut changed = vec![match_id];
    for dependent in matches.iter_mut().filter(|m| m.depends_on(match_id)) {
        for (slot, prereq) in [
            (&mut dependent.player1_id, dependent.player1_prereq),
            (&mut dependent.player2_id, dependent.player2_prereq),
        ] {
            if prereq.is_some_and(|p| p.match_id == match_id) {
                *slot = None;
            }
        }
        dependent.state = MatchState::Pending;
        dependent.scores_csv.clear();
        dependent.updated_at = now;
        changed.push(dependent.id);
    }
    Ok(changed)
}

/// Assign a station to a match, or clear it with `None`. Assignments stay local even for
/// linked tournaments.
pub async fn assign_station(
    state: &SharedState,
    key: &str,
    match_id: u64,
    station_id: Option<u64>,
) -> Result<MatchDto, ServiceError> {
    let (store, tournament, _gate) = tournament_service::lock(state, key).await?.into_parts();
    let matches = store.list_matches(tournament.id).await?;
    let mut entry = find_match(&matches, match_id)?.clone();

    if let Some(station_id) = station_id {
        if effective_state(&entry) == MatchState::Complete {
            return Err(ServiceError::InvalidState(format!(
                "match {} is complete and cannot be assigned a station",
                entry.identifier
            )));
        }
        let stations = store.list_stations(tournament.id).await?;
        if !stations.iter().any(|station| station.id == station_id) {
            return Err(ServiceError::NotFound(format!("station {station_id}")));
        }
        if let Some(busy) = matches.iter().find(|other| {
            other.id != match_id
                && other.station_id == Some(station_id)
                && effective_state(other) != MatchState::Complete
        }) {
            return Err(ServiceError::Conflict(format!(
                "station {station_id} is already hosting match {}",
                busy.identifier
            )));
        }
    }

    entry.station_id = station_id;
    entry.updated_at = SystemTime::now();
    store.save_matches(vec![entry]).await?;
    info!(tournament_id = tournament.id, match_id, station_id, "station assignment changed");

    events::broadcast_station_assigned(
        state,
        &StationAssigned {
            tournament_id: tournament.id,
            match_id,
            station_id,
        },
    );
    publish(state, &store, &tournament, &[match_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::NotFound(format!("match {match_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Prerequisite;

    fn entry(id: u64, round: i32, players: (Option<u64>, Option<u64>)) -> MatchEntity {
        let state = if players.0.is_some() && players.1.is_some() {
            MatchState::Open
        } else {
            MatchState::Pending
        };
        MatchEntity {
            id,
            tournament_id: 1,
            identifier: layout_identifier(id),
            round,
            suggested_play_order: id as u32,
            state,
            player1_id: players.0,
            player2_id: players.1,
            player1_prereq: None,
            player2_prereq: None,
            winner_id: None,
            loser_id: None,
            scores_csv: String::new(),
            forfeited: false,
            underway_at: None,
            station_id: None,
            completed_at: None,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn layout_identifier(id: u64) -> String {
        crate::bracket::engine::identifier_for(id as usize - 1)
    }

    /// Semifinals 1 and 2 feed final 3 (winners) and third place 4 (losers).
    fn four_player_bracket() -> Vec<MatchEntity> {
        let mut final_match = entry(3, 2, (None, None));
        final_match.player1_prereq = Some(Prerequisite {
            match_id: 1,
            loser: false,
        });
        final_match.player2_prereq = Some(Prerequisite {
            match_id: 2,
            loser: false,
        });
        let mut third = entry(4, 2, (None, None));
        third.player1_prereq = Some(Prerequisite {
            match_id: 1,
            loser: true,
        });
        third.player2_prereq = Some(Prerequisite {
            match_id: 2,
            loser: true,
        });
        vec![
            entry(1, 1, (Some(10), Some(40))),
            entry(2, 1, (Some(20), Some(30))),
            final_match,
            third,
        ]
    }

    fn winner(winner_id: u64) -> Report {
        Report::Winner {
            winner_id,
            scores: "2-1".into(),
        }
    }

    #[test]
    fn completing_both_semis_opens_final_and_third_place() {
        let mut matches = four_player_bracket();
        let now = SystemTime::now();
        let changed = apply(&mut matches, 1, &winner(10), now).unwrap();
        assert_eq!(changed, vec![1, 3, 4]);
        assert_eq!(matches[2].player1_id, Some(10));
        assert_eq!(matches[2].state, MatchState::Pending);

        apply(&mut matches, 2, &winner(30), now).unwrap();
        assert_eq!(matches[2].player2_id, Some(30));
        assert_eq!(matches[2].state, MatchState::Open);
        assert_eq!((matches[3].player1_id, matches[3].player2_id), (Some(40), Some(20)));
        assert_eq!(matches[3].state, MatchState::Open);
    }

    #[test]
    fn completion_frees_the_station() {
        let mut matches = four_player_bracket();
        matches[0].station_id = Some(7);
        apply(&mut matches, 1, &Report::MarkUnderway, SystemTime::now()).unwrap();
        apply(&mut matches, 1, &winner(40), SystemTime::now()).unwrap();
        assert_eq!(matches[0].station_id, None);
        assert_eq!(matches[0].underway_at, None);
        assert_eq!(matches[0].loser_id, Some(10));
    }

    #[test]
    fn winner_must_play_in_the_match() {
        let mut matches = four_player_bracket();
        assert!(matches!(
            apply(&mut matches, 1, &winner(20), SystemTime::now()),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            apply(&mut matches, 3, &winner(10), SystemTime::now()),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn underway_requires_open_match() {
        let mut matches = four_player_bracket();
        let now = SystemTime::now();
        apply(&mut matches, 1, &Report::MarkUnderway, now).unwrap();
        assert_eq!(effective_state(&matches[0]), MatchState::Underway);
        assert!(apply(&mut matches, 1, &Report::MarkUnderway, now).is_err());
        assert!(apply(&mut matches, 3, &Report::MarkUnderway, now).is_err());

        apply(&mut matches, 1, &Report::UnmarkUnderway, now).unwrap();
        assert_eq!(effective_state(&matches[0]), MatchState::Open);
    }

    #[test]
    fn disqualification_defaults_to_zero_score() {
        let mut matches = four_player_bracket();
        let report = Report::Disqualify {
            winner_id: 20,
            loser_id: 30,
        };
        apply(&mut matches, 2, &report, SystemTime::now()).unwrap();
        assert_eq!(matches[1].scores_csv, "0-0");
        assert!(matches[1].forfeited);
        assert_eq!(matches[1].winner_id, Some(20));

        let mut matches = four_player_bracket();
        matches[1].scores_csv = "1-0".into();
        apply(&mut matches, 2, &report, SystemTime::now()).unwrap();
        assert_eq!(matches[1].scores_csv, "1-0");
    }

    #[test]
    fn reopen_clears_dependent_slots() {
        let mut matches = four_player_bracket();
        let now = SystemTime::now();
        apply(&mut matches, 1, &winner(10), now).unwrap();
        apply(&mut matches, 2, &winner(20), now).unwrap();
        assert_eq!(matches[2].state, MatchState::Open);

        let changed = apply(&mut matches, 1, &Report::Reopen, now).unwrap();
        assert_eq!(changed, vec![1, 3, 4]);
        assert_eq!(matches[0].state, MatchState::Open);
        assert_eq!(matches[0].winner_id, None);
        assert_eq!(matches[2].player1_id, None);
        assert_eq!(matches[2].player2_id, Some(20));
        assert_eq!(matches[2].state, MatchState::Pending);
    }

    #[test]
    fn reopen_refused_once_dependent_started() {
        let mut matches = four_player_bracket();
        let now = SystemTime::now();
        apply(&mut matches, 1, &winner(10), now).unwrap();
        apply(&mut matches, 2, &winner(20), now).unwrap();
        apply(&mut matches, 3, &Report::MarkUnderway, now).unwrap();
        assert!(matches!(
            apply(&mut matches, 1, &Report::Reopen, now),
            Err(ServiceError::InvalidState(_))
        ));
        assert!(apply(&mut matches, 2, &Report::Reopen, now).is_err());
        assert!(matches!(
            apply(&mut matches, 3, &Report::Reopen, now),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn stored_rounds_get_bracket_names() {
        let matches = four_player_bracket();
        let names = round_names(TournamentType::SingleElimination, &matches);
        assert_eq!(names[&1], "Semifinals");
        assert_eq!(names[&3], "Finals");
        assert_eq!(names[&4], "Third Place");

        let mut losers = entry(5, -1, (None, None));
        losers.player1_prereq = Some(Prerequisite {
            match_id: 1,
            loser: true,
        });
        let grand_final = entry(6, 3, (None, None));
        let double = vec![matches[0].clone(), matches[2].clone(), losers, grand_final];
        let names = round_names(TournamentType::DoubleElimination, &double);
        assert_eq!(names[&1], "Winners Semifinals");
        assert_eq!(names[&3], "Winners Finals");
        assert_eq!(names[&5], "Losers Finals");
        assert_eq!(names[&6], "Grand Finals");
    }
}
