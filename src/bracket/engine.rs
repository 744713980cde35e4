//! Match skeleton generation for the supported tournament formats.
//!
//! Elimination brackets are first built at full power-of-two size with empty seats, then any
//! match holding an empty seat is collapsed: its winner slot is whoever filled the other seat and
//! its loser slot stays empty. Collapsing runs in generation order, which is also dependency
//! order, so a single pass resolves every bye including those that cascade into the losers
//! bracket.

use thiserror::Error;

use crate::{bracket::seeding::bracket_positions, dao::models::TournamentType};

/// Options that alter the generated structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Add a match between the semifinal losers (single elimination only).
    pub third_place_match: bool,
}

/// Which part of the bracket a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BracketSide {
    /// Winners bracket, or the whole bracket in single elimination.
    Winners,
    /// Bronze match between the semifinal losers.
    ThirdPlace,
    /// Winners champion against losers champion.
    GrandFinal,
    /// Losers bracket (negative rounds).
    Losers,
    /// Round robin pool.
    RoundRobin,
}

/// Who fills a match slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A participant, by id.
    Entrant(u64),
    /// The winner of the match at this index in [`Bracket::matches`].
    Winner(usize),
    /// The loser of the match at this index in [`Bracket::matches`].
    Loser(usize),
}

/// Generated match, indexed by its position in [`Bracket::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMatch {
    pub index: usize,
    /// Bracket label (A, B, ..., AA).
    pub identifier: String,
    /// Positive on the winners side, negative in the losers bracket.
    pub round: i32,
    pub play_order: u32,
    pub side: BracketSide,
    pub player1: Slot,
    pub player2: Slot,
}

/// Full match skeleton for a tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    /// Format the bracket was generated for.
    pub format: TournamentType,
    pub matches: Vec<BracketMatch>,
    /// Number of winners-side rounds (or round robin rounds).
    pub winners_rounds: u32,
    /// Number of losers bracket rounds before collapsing byes.
    pub losers_rounds: u32,
}

/// Errors raised by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Fewer than two participants.
    #[error("at least 2 participants are required, got {got}")]
    NotEnoughEntrants { got: usize },
}

/// Generate the match skeleton for `entrants`, given in seed order (seed 1 first).
pub fn generate(
    format: TournamentType,
    entrants: &[u64],
    options: EngineOptions,
) -> Result<Bracket, EngineError> {
    if entrants.len() < 2 {
        return Err(EngineError::NotEnoughEntrants {
            got: entrants.len(),
        });
    }

    let mut builder = Builder::default();
    let (winners_rounds, losers_rounds) = match format {
        TournamentType::SingleElimination => {
            let rounds = single_elimination(&mut builder, entrants, options.third_place_match);
            (rounds, 0)
        }
        TournamentType::DoubleElimination => double_elimination(&mut builder, entrants),
        TournamentType::RoundRobin => (round_robin(&mut builder, entrants), 0),
    };

    Ok(Bracket {
        format,
        matches: builder.resolve(),
        winners_rounds,
        losers_rounds,
    })
}

/// Challonge style identifier: A..Z, then AA, AB, ...
pub fn identifier_for(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seat {
    Entrant(u64),
    Bye,
    Winner(usize),
    Loser(usize),
}

impl Seat {
    fn into_slot(self) -> Option<Slot> {
        match self {
            Seat::Entrant(id) => Some(Slot::Entrant(id)),
            Seat::Winner(index) => Some(Slot::Winner(index)),
            Seat::Loser(index) => Some(Slot::Loser(index)),
            Seat::Bye => None,
        }
    }
}

impl From<Slot> for Seat {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Entrant(id) => Seat::Entrant(id),
            Slot::Winner(index) => Seat::Winner(index),
            Slot::Loser(index) => Seat::Loser(index),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RawMatch {
    round: i32,
    side: BracketSide,
    player1: Seat,
    player2: Seat,
}

/// Outcome of a raw match after bye resolution.
#[derive(Debug, Clone, Copy)]
enum Resolved {
    Kept(usize),
    Collapsed { winner: Seat, loser: Seat },
}

#[derive(Default)]
struct Builder {
    raw: Vec<RawMatch>,
}

impl Builder {
    fn push(&mut self, round: i32, side: BracketSide, player1: Seat, player2: Seat) -> usize {
        self.raw.push(RawMatch {
            round,
            side,
            player1,
            player2,
        });
        self.raw.len() - 1
    }

    fn resolve(self) -> Vec<BracketMatch> {
        let mut resolved: Vec<Resolved> = Vec::with_capacity(self.raw.len());
        let mut kept: Vec<BracketMatch> = Vec::new();

        for raw in self.raw {
            let player1 = follow(raw.player1, &resolved);
            let player2 = follow(raw.player2, &resolved);
            let outcome = match (player1.into_slot(), player2.into_slot()) {
                (Some(player1), Some(player2)) => {
                    let index = kept.len();
                    kept.push(BracketMatch {
                        index,
                        identifier: identifier_for(index),
                        round: raw.round,
                        play_order: index as u32 + 1,
                        side: raw.side,
                        player1,
                        player2,
                    });
                    Resolved::Kept(index)
                }
                (None, _) => Resolved::Collapsed {
                    winner: player2,
                    loser: Seat::Bye,
                },
                (_, None) => Resolved::Collapsed {
                    winner: player1,
                    loser: Seat::Bye,
                },
            };
            resolved.push(outcome);
        }

        kept
    }
}

/// Translate a seat that references a raw match into the resolved bracket.
fn follow(seat: Seat, resolved: &[Resolved]) -> Seat {
    match seat {
        Seat::Winner(raw) => match resolved[raw] {
            Resolved::Kept(index) => Slot::Winner(index).into(),
            Resolved::Collapsed { winner, .. } => winner,
        },
        Seat::Loser(raw) => match resolved[raw] {
            Resolved::Kept(index) => Slot::Loser(index).into(),
            Resolved::Collapsed { loser, .. } => loser,
        },
        other => other,
    }
}

/// Seats of the first round in bracket line order, with byes for missing seeds.
fn first_round_seats(entrants: &[u64]) -> Vec<Seat> {
    let size = entrants.len().next_power_of_two();
    bracket_positions(size)
        .into_iter()
        .map(|seed| {
            entrants
                .get(seed - 1)
                .map_or(Seat::Bye, |id| Seat::Entrant(*id))
        })
        .collect()
}

/// Build the winners side and return the raw indices of each round.
fn winners_rounds(
    builder: &mut Builder,
    entrants: &[u64],
    third_place_match: bool,
) -> Vec<Vec<usize>> {
    let mut rounds: Vec<Vec<usize>> = Vec::new();
    let mut seats = first_round_seats(entrants);
    let mut round = 1;

    while seats.len() > 1 {
        if seats.len() == 2 && third_place_match {
            if let Some(semis) = rounds.last() {
                if let [first, second] = semis.as_slice() {
                    builder.push(
                        round,
                        BracketSide::ThirdPlace,
                        Seat::Loser(*first),
                        Seat::Loser(*second),
                    );
                }
            }
        }

        let indices: Vec<usize> = seats
            .chunks(2)
            .map(|pair| builder.push(round, BracketSide::Winners, pair[0], pair[1]))
            .collect();
        seats = indices.iter().map(|index| Seat::Winner(*index)).collect();
        rounds.push(indices);
        round += 1;
    }

    rounds
}

fn single_elimination(builder: &mut Builder, entrants: &[u64], third_place_match: bool) -> u32 {
    winners_rounds(builder, entrants, third_place_match).len() as u32
}

/// Double elimination with a single grand final.
///
/// Losers bracket rounds alternate between drop-in rounds (survivors meet the losers of the
/// next winners round) and consolidation rounds (survivors meet each other). Drop-in order is
/// reversed every other round so rematches are pushed back.
fn double_elimination(builder: &mut Builder, entrants: &[u64]) -> (u32, u32) {
    let mut seats = first_round_seats(entrants);
    let total_rounds = seats.len().trailing_zeros() as i32;

    let mut survivors: Vec<Seat> = Vec::new();
    let mut losers_round = 0i32;

    for round in 1..=total_rounds {
        let indices: Vec<usize> = seats
            .chunks(2)
            .map(|pair| builder.push(round, BracketSide::Winners, pair[0], pair[1]))
            .collect();
        seats = indices.iter().map(|index| Seat::Winner(*index)).collect();

        if round == 1 {
            if total_rounds > 1 {
                losers_round += 1;
                survivors = indices
                    .chunks(2)
                    .map(|pair| {
                        let index = builder.push(
                            -losers_round,
                            BracketSide::Losers,
                            Seat::Loser(pair[0]),
                            Seat::Loser(pair[1]),
                        );
                        Seat::Winner(index)
                    })
                    .collect();
            } else {
                survivors = vec![Seat::Loser(indices[0])];
            }
        } else {
            let mut dropped: Vec<Seat> = indices.iter().map(|index| Seat::Loser(*index)).collect();
            if round % 2 == 0 {
                dropped.reverse();
            }

            losers_round += 1;
            survivors = dropped
                .into_iter()
                .zip(survivors)
                .map(|(drop_in, survivor)| {
                    let index =
                        builder.push(-losers_round, BracketSide::Losers, drop_in, survivor);
                    Seat::Winner(index)
                })
                .collect();

            if round < total_rounds {
                losers_round += 1;
                survivors = survivors
                    .chunks(2)
                    .map(|pair| {
                        let index =
                            builder.push(-losers_round, BracketSide::Losers, pair[0], pair[1]);
                        Seat::Winner(index)
                    })
                    .collect();
            }
        }

    }

    let champion = seats.first().copied().unwrap_or(Seat::Bye);
    let challenger = survivors.first().copied().unwrap_or(Seat::Bye);
    builder.push(
        total_rounds + 1,
        BracketSide::GrandFinal,
        champion,
        challenger,
    );

    (total_rounds as u32, losers_round as u32)
}

/// Circle method: seat 0 stays put while the others rotate one position per round.
fn round_robin(builder: &mut Builder, entrants: &[u64]) -> u32 {
    let mut seats: Vec<Seat> = entrants.iter().map(|id| Seat::Entrant(*id)).collect();
    if seats.len() % 2 == 1 {
        seats.push(Seat::Bye);
    }

    let count = seats.len();
    let rounds = count - 1;
    for round in 1..=rounds {
        for i in 0..count / 2 {
            builder.push(
                round as i32,
                BracketSide::RoundRobin,
                seats[i],
                seats[count - 1 - i],
            );
        }
        if let Some(last) = seats.pop() {
            seats.insert(1, last);
        }
    }

    rounds as u32
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn entrants(n: u64) -> Vec<u64> {
        (1..=n).map(|i| i * 100).collect()
    }

    fn single(n: u64) -> Bracket {
        generate(
            TournamentType::SingleElimination,
            &entrants(n),
            EngineOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn identifiers_roll_over_after_z() {
        assert_eq!(identifier_for(0), "A");
        assert_eq!(identifier_for(25), "Z");
        assert_eq!(identifier_for(26), "AA");
        assert_eq!(identifier_for(27), "AB");
        assert_eq!(identifier_for(701), "ZZ");
        assert_eq!(identifier_for(702), "AAA");
    }

    #[test]
    fn rejects_single_entrant() {
        let err = generate(
            TournamentType::SingleElimination,
            &[1],
            EngineOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::NotEnoughEntrants { got: 1 });
    }

    #[test]
    fn four_player_single_elimination() {
        let bracket = single(4);
        assert_eq!(bracket.matches.len(), 3);
        assert_eq!(bracket.winners_rounds, 2);
        assert_eq!(bracket.matches[0].player1, Slot::Entrant(100));
        assert_eq!(bracket.matches[0].player2, Slot::Entrant(400));
        assert_eq!(bracket.matches[1].player1, Slot::Entrant(200));
        assert_eq!(bracket.matches[1].player2, Slot::Entrant(300));
        assert_eq!(bracket.matches[2].player1, Slot::Winner(0));
        assert_eq!(bracket.matches[2].player2, Slot::Winner(1));
        assert_eq!(bracket.matches[2].identifier, "C");
    }

    #[test]
    fn byes_advance_top_seeds() {
        let bracket = single(5);
        // 8 seats, three byes: only seeds 4 and 5 play in round one.
        assert_eq!(bracket.matches.len(), 4);
        let first = &bracket.matches[0];
        assert_eq!(first.round, 1);
        assert_eq!(first.player1, Slot::Entrant(400));
        assert_eq!(first.player2, Slot::Entrant(500));

        let round_two: Vec<_> = bracket.matches.iter().filter(|m| m.round == 2).collect();
        assert_eq!(round_two.len(), 2);
        assert_eq!(round_two[0].player1, Slot::Entrant(100));
        assert_eq!(round_two[0].player2, Slot::Winner(0));
        assert_eq!(round_two[1].player1, Slot::Entrant(200));
        assert_eq!(round_two[1].player2, Slot::Entrant(300));
    }

    #[test]
    fn single_elimination_match_count_is_n_minus_one() {
        for n in 2..=33 {
            assert_eq!(single(n).matches.len() as u64, n - 1, "n = {n}");
        }
    }

    #[test]
    fn third_place_match_uses_semifinal_losers() {
        let bracket = generate(
            TournamentType::SingleElimination,
            &entrants(4),
            EngineOptions {
                third_place_match: true,
            },
        )
        .unwrap();
        assert_eq!(bracket.matches.len(), 4);
        let third = bracket
            .matches
            .iter()
            .find(|m| m.side == BracketSide::ThirdPlace)
            .unwrap();
        assert_eq!(third.player1, Slot::Loser(0));
        assert_eq!(third.player2, Slot::Loser(1));
        // Played before the final.
        let final_match = bracket.matches.last().unwrap();
        assert_eq!(final_match.side, BracketSide::Winners);
        assert!(third.play_order < final_match.play_order);
    }

    #[test]
    fn third_place_collapses_with_three_players() {
        let bracket = generate(
            TournamentType::SingleElimination,
            &entrants(3),
            EngineOptions {
                third_place_match: true,
            },
        )
        .unwrap();
        assert!(
            bracket
                .matches
                .iter()
                .all(|m| m.side != BracketSide::ThirdPlace)
        );
        assert_eq!(bracket.matches.len(), 2);
    }

    #[test]
    fn double_elimination_match_count() {
        // 2n - 2 matches without a grand final reset.
        for n in 3..=20u64 {
            let bracket = generate(
                TournamentType::DoubleElimination,
                &entrants(n),
                EngineOptions::default(),
            )
            .unwrap();
            assert_eq!(bracket.matches.len() as u64, 2 * n - 2, "n = {n}");
        }
    }

    #[test]
    fn double_elimination_eight_players_structure() {
        let bracket = generate(
            TournamentType::DoubleElimination,
            &entrants(8),
            EngineOptions::default(),
        )
        .unwrap();
        assert_eq!(bracket.winners_rounds, 3);
        assert_eq!(bracket.losers_rounds, 4);
        let losers: Vec<_> = bracket
            .matches
            .iter()
            .filter(|m| m.side == BracketSide::Losers)
            .collect();
        assert_eq!(losers.len(), 6);
        assert!(losers.iter().all(|m| m.round < 0));

        let grand_final = bracket.matches.last().unwrap();
        assert_eq!(grand_final.side, BracketSide::GrandFinal);
        assert_eq!(grand_final.round, 4);
        assert!(matches!(grand_final.player1, Slot::Winner(_)));
        assert!(matches!(grand_final.player2, Slot::Winner(_)));
    }

    #[test]
    fn double_elimination_two_players_rematch() {
        let bracket = generate(
            TournamentType::DoubleElimination,
            &entrants(2),
            EngineOptions::default(),
        )
        .unwrap();
        assert_eq!(bracket.matches.len(), 2);
        assert_eq!(bracket.matches[1].player1, Slot::Winner(0));
        assert_eq!(bracket.matches[1].player2, Slot::Loser(0));
    }

    #[test]
    fn slots_only_reference_earlier_matches() {
        for format in [
            TournamentType::SingleElimination,
            TournamentType::DoubleElimination,
        ] {
            for n in 2..=24 {
                let bracket = generate(format, &entrants(n), EngineOptions::default()).unwrap();
                for m in &bracket.matches {
                    for slot in [m.player1, m.player2] {
                        if let Slot::Winner(i) | Slot::Loser(i) = slot {
                            assert!(i < m.index, "{format:?} n={n} match {}", m.identifier);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn round_robin_pairs_everyone_once() {
        for n in 2..=9u64 {
            let bracket = generate(
                TournamentType::RoundRobin,
                &entrants(n),
                EngineOptions::default(),
            )
            .unwrap();
            assert_eq!(bracket.matches.len() as u64, n * (n - 1) / 2);

            let mut pairs = HashSet::new();
            for m in &bracket.matches {
                let (Slot::Entrant(a), Slot::Entrant(b)) = (m.player1, m.player2) else {
                    panic!("round robin slots must be entrants");
                };
                assert!(pairs.insert((a.min(b), a.max(b))));
            }
        }
    }

    #[test]
    fn round_robin_plays_once_per_round() {
        let bracket = generate(
            TournamentType::RoundRobin,
            &entrants(6),
            EngineOptions::default(),
        )
        .unwrap();
        assert_eq!(bracket.winners_rounds, 5);
        for round in 1..=5 {
            let mut seen = HashSet::new();
            for m in bracket.matches.iter().filter(|m| m.round == round) {
                for slot in [m.player1, m.player2] {
                    assert!(seen.insert(slot));
                }
            }
            assert_eq!(seen.len(), 6);
        }
    }
}
