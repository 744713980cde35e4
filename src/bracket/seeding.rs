//! Seed ordering helpers shared by the bracket editor and the engine.

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

use crate::dao::models::ParticipantEntity;

/// Participant placed at a given seed for bracket generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededEntrant {
    pub participant_id: u64,
    pub name: String,
    pub seed: u32,
}

/// Errors raised while building a seed order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("participant {0} does not belong to this tournament")]
    UnknownParticipant(u64),
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(u64),
    #[error("seed {0} is assigned more than once")]
    DuplicateSeed(u32),
}

/// Participants sorted by persisted seed, ties broken by id.
pub fn by_persisted_seed(participants: &[ParticipantEntity]) -> Vec<&ParticipantEntity> {
    let mut sorted: Vec<&ParticipantEntity> = participants.iter().collect();
    sorted.sort_by_key(|participant| (participant.seed, participant.id));
    sorted
}

/// Build the seed order used for a preview.
///
/// Without a custom order the persisted seeds decide. With one, the listed participants take
/// seeds 1..=n in the given order and everyone left out follows in persisted-seed order.
pub fn order_participants(
    participants: &[ParticipantEntity],
    custom_order: Option<&[u64]>,
) -> Result<Vec<SeededEntrant>, SeedError> {
    let mut remaining: IndexMap<u64, &ParticipantEntity> = by_persisted_seed(participants)
        .into_iter()
        .map(|participant| (participant.id, participant))
        .collect();

    let mut ordered: Vec<&ParticipantEntity> = Vec::with_capacity(participants.len());
    if let Some(order) = custom_order {
        let mut seen = HashSet::with_capacity(order.len());
        for id in order {
            if !seen.insert(*id) {
                return Err(SeedError::DuplicateParticipant(*id));
            }
            let participant = remaining
                .shift_remove(id)
                .ok_or(SeedError::UnknownParticipant(*id))?;
            ordered.push(participant);
        }
    }
    ordered.extend(remaining.into_values());

    Ok(ordered
        .into_iter()
        .zip(1u32..)
        .map(|(participant, seed)| SeededEntrant {
            participant_id: participant.id,
            name: participant.name.clone(),
            seed,
        })
        .collect())
}

/// Reject seed assignments that reuse a participant or a seed value.
pub fn check_assignments(assignments: &[(u64, u32)]) -> Result<(), SeedError> {
    let mut participants = HashSet::with_capacity(assignments.len());
    let mut seeds = HashSet::with_capacity(assignments.len());
    for (participant_id, seed) in assignments {
        if !participants.insert(*participant_id) {
            return Err(SeedError::DuplicateParticipant(*participant_id));
        }
        if !seeds.insert(*seed) {
            return Err(SeedError::DuplicateSeed(*seed));
        }
    }
    Ok(())
}

/// Seed for a newly registered participant: one past the highest seed in use.
pub fn next_free_seed(participants: &[ParticipantEntity]) -> u32 {
    participants
        .iter()
        .map(|participant| participant.seed)
        .max()
        .unwrap_or(0)
        + 1
}

/// Renumber seeds to 1..=n keeping the current order, returning only the participants whose
/// seed changed.
pub fn compact_seeds(participants: &[ParticipantEntity]) -> Vec<(u64, u32)> {
    by_persisted_seed(participants)
        .into_iter()
        .zip(1u32..)
        .filter(|(participant, seed)| participant.seed != *seed)
        .map(|(participant, seed)| (participant.id, seed))
        .collect()
}

/// Move `participant_id` to `seed`, shifting everyone in between, and renumber to 1..=n.
/// Returns only the participants whose seed changed. Seeds past the end clamp to the last seat.
pub fn reseat(participants: &[ParticipantEntity], participant_id: u64, seed: u32) -> Vec<(u64, u32)> {
    let mut order: Vec<&ParticipantEntity> = by_persisted_seed(participants)
        .into_iter()
        .filter(|participant| participant.id != participant_id)
        .collect();
    let Some(moved) = participants.iter().find(|p| p.id == participant_id) else {
        return Vec::new();
    };
    let index = (seed.max(1) as usize - 1).min(order.len());
    order.insert(index, moved);
    order
        .into_iter()
        .zip(1u32..)
        .filter(|(participant, seed)| participant.seed != *seed)
        .map(|(participant, seed)| (participant.id, seed))
        .collect()
}

/// Random participant order for the editor's shuffle button.
pub fn shuffled_order<R: Rng + ?Sized>(participants: &[ParticipantEntity], rng: &mut R) -> Vec<u64> {
    let mut ids: Vec<u64> = participants.iter().map(|participant| participant.id).collect();
    ids.shuffle(rng);
    ids
}

/// Seed numbers in bracket line order for a bracket of `size` seats (a power of two).
///
/// Seed 1 meets seed `size`, and the two top seeds sit in opposite halves so they can only
/// meet in the final: `[1, 8, 4, 5, 2, 7, 3, 6]` for eight seats.
pub fn bracket_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1usize];
    let mut current = 1usize;
    while current < size {
        current *= 2;
        positions = positions
            .into_iter()
            .flat_map(|seed| [seed, current + 1 - seed])
            .collect();
    }
    positions
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn participant(id: u64, seed: u32) -> ParticipantEntity {
        ParticipantEntity {
            id,
            tournament_id: 1,
            name: format!("player-{id}"),
            seed,
            email: None,
            misc: None,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn positions_keep_top_seeds_apart() {
        assert_eq!(bracket_positions(1), vec![1]);
        assert_eq!(bracket_positions(2), vec![1, 2]);
        assert_eq!(bracket_positions(4), vec![1, 4, 2, 3]);
        assert_eq!(bracket_positions(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn persisted_seeds_decide_without_custom_order() {
        let participants = vec![participant(1, 3), participant(2, 1), participant(3, 2)];
        let order = order_participants(&participants, None).unwrap();
        let ids: Vec<u64> = order.iter().map(|entrant| entrant.participant_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(order[0].seed, 1);
        assert_eq!(order[2].seed, 3);
    }

    #[test]
    fn custom_order_overrides_and_rest_follows() {
        let participants = vec![
            participant(1, 1),
            participant(2, 2),
            participant(3, 3),
            participant(4, 4),
        ];
        let order = order_participants(&participants, Some(&[4, 2])).unwrap();
        let ids: Vec<u64> = order.iter().map(|entrant| entrant.participant_id).collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);
        let seeds: Vec<u32> = order.iter().map(|entrant| entrant.seed).collect();
        assert_eq!(seeds, vec![1, 2, 3, 4]);
    }

    #[test]
    fn custom_order_rejects_unknown_and_repeated_ids() {
        let participants = vec![participant(1, 1), participant(2, 2)];
        assert_eq!(
            order_participants(&participants, Some(&[9])),
            Err(SeedError::UnknownParticipant(9))
        );
        assert_eq!(
            order_participants(&participants, Some(&[1, 1])),
            Err(SeedError::DuplicateParticipant(1))
        );
    }

    #[test]
    fn duplicate_seed_values_are_rejected() {
        assert_eq!(
            check_assignments(&[(1, 1), (2, 1)]),
            Err(SeedError::DuplicateSeed(1))
        );
        assert!(check_assignments(&[(1, 2), (2, 1)]).is_ok());
    }

    #[test]
    fn compaction_only_reports_changes() {
        let participants = vec![participant(1, 1), participant(2, 3), participant(3, 7)];
        assert_eq!(compact_seeds(&participants), vec![(2, 2), (3, 3)]);
        assert_eq!(next_free_seed(&participants), 8);
        assert_eq!(next_free_seed(&[]), 1);
    }

    #[test]
    fn reseat_shifts_the_seats_in_between() {
        let participants: Vec<_> = (1..=4).map(|id| participant(id, id as u32)).collect();
        assert_eq!(reseat(&participants, 4, 2), vec![(4, 2), (2, 3), (3, 4)]);
        assert_eq!(reseat(&participants, 1, 99), vec![(2, 1), (3, 2), (4, 3), (1, 4)]);
        assert!(reseat(&participants, 2, 2).is_empty());
        assert!(reseat(&participants, 9, 1).is_empty());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let participants: Vec<_> = (1..=6).map(|id| participant(id, id as u32)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = shuffled_order(&participants, &mut rng);
        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
    }
}
