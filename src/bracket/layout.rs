//! Turns a generated [`Bracket`] into boxes and columns the dashboard can draw on a canvas.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    bracket::engine::{Bracket, BracketMatch, BracketSide, Slot},
    dao::models::TournamentType,
};

/// Box sizes and spacing, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub match_width: u32,
    pub match_height: u32,
    pub column_gap: u32,
    pub row_gap: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            match_width: 200,
            match_height: 56,
            column_gap: 48,
            row_gap: 16,
        }
    }
}

/// One match box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchLayout {
    pub identifier: String,
    pub play_order: u32,
    /// Label of the first slot: a participant name or "Winner of X" / "Loser of X".
    pub player1: String,
    pub player2: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A column of matches sharing a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundLayout {
    pub round: i32,
    pub name: String,
    pub x: u32,
    pub matches: Vec<MatchLayout>,
}

/// Visualisation payload for a whole bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BracketLayout {
    pub rounds: Vec<RoundLayout>,
    pub width: u32,
    pub height: u32,
}

/// Lay out `bracket`, resolving participant names through `names`.
pub fn render(
    bracket: &Bracket,
    names: &HashMap<u64, String>,
    options: &LayoutOptions,
) -> BracketLayout {
    let painter = Painter {
        bracket,
        names,
        options,
    };
    match bracket.format {
        TournamentType::RoundRobin => painter.round_robin(),
        TournamentType::SingleElimination | TournamentType::DoubleElimination => {
            painter.elimination()
        }
    }
}

/// Display name of a round.
pub fn round_name(bracket: &Bracket, side: BracketSide, round: i32) -> String {
    let losers_final = bracket
        .matches
        .iter()
        .filter(|m| m.side == BracketSide::Losers)
        .map(|m| m.round)
        .min();
    round_label(
        bracket.format,
        side,
        round,
        bracket.winners_rounds,
        losers_final,
    )
}

/// Display name of a round given the bracket shape: the number of winners-side rounds and the
/// (most negative) round of the losers final.
pub fn round_label(
    format: TournamentType,
    side: BracketSide,
    round: i32,
    winners_rounds: u32,
    losers_final: Option<i32>,
) -> String {
    match side {
        BracketSide::RoundRobin => format!("Round {round}"),
        BracketSide::ThirdPlace => "Third Place".to_owned(),
        BracketSide::GrandFinal => "Grand Finals".to_owned(),
        BracketSide::Losers if losers_final == Some(round) => "Losers Finals".to_owned(),
        BracketSide::Losers => format!("Losers Round {}", round.unsigned_abs()),
        BracketSide::Winners => {
            let base = match winners_rounds as i32 - round {
                0 => "Finals".to_owned(),
                1 => "Semifinals".to_owned(),
                2 => "Quarterfinals".to_owned(),
                _ => format!("Round {round}"),
            };
            if format == TournamentType::DoubleElimination {
                format!("Winners {base}")
            } else {
                base
            }
        }
    }
}

struct Painter<'a> {
    bracket: &'a Bracket,
    names: &'a HashMap<u64, String>,
    options: &'a LayoutOptions,
}

impl Painter<'_> {
    fn row_unit(&self) -> u32 {
        self.options.match_height + self.options.row_gap
    }

    fn column_x(&self, column: u32) -> u32 {
        column * (self.options.match_width + self.options.column_gap)
    }

    fn width_for(&self, columns: u32) -> u32 {
        self.column_x(columns).saturating_sub(self.options.column_gap)
    }

    fn label(&self, slot: Slot) -> String {
        match slot {
            Slot::Entrant(id) => self
                .names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("#{id}")),
            Slot::Winner(index) => format!("Winner of {}", self.identifier(index)),
            Slot::Loser(index) => format!("Loser of {}", self.identifier(index)),
        }
    }

    fn identifier(&self, index: usize) -> &str {
        self.bracket
            .matches
            .get(index)
            .map_or("?", |m| m.identifier.as_str())
    }

    fn boxed(&self, m: &BracketMatch, x: u32, y: u32) -> MatchLayout {
        MatchLayout {
            identifier: m.identifier.clone(),
            play_order: m.play_order,
            player1: self.label(m.player1),
            player2: self.label(m.player2),
            x,
            y,
            width: self.options.match_width,
            height: self.options.match_height,
        }
    }

    /// Spread `matches` evenly over `rows` row slots starting at `top`.
    fn column(&self, matches: &[&BracketMatch], x: u32, top: u32, rows: u32) -> Vec<MatchLayout> {
        let count = matches.len().max(1) as u32;
        let band = rows * self.row_unit() / count;
        let inset = band.saturating_sub(self.options.match_height) / 2;
        matches
            .iter()
            .zip(0u32..)
            .map(|(m, i)| self.boxed(m, x, top + i * band + inset))
            .collect()
    }

    fn section_height(&self, rows: u32) -> u32 {
        rows * self.row_unit()
    }

    fn round_robin(&self) -> BracketLayout {
        let by_round = group(self.bracket, |side| side == BracketSide::RoundRobin);
        let mut rows = 0;
        let rounds: Vec<RoundLayout> = by_round
            .iter()
            .zip(0u32..)
            .map(|((round, matches), column)| {
                rows = rows.max(matches.len() as u32);
                let x = self.column_x(column);
                RoundLayout {
                    round: *round,
                    name: round_name(self.bracket, BracketSide::RoundRobin, *round),
                    x,
                    matches: self.column(matches, x, 0, matches.len() as u32),
                }
            })
            .collect();

        BracketLayout {
            width: self.width_for(rounds.len() as u32),
            height: self.section_height(rows),
            rounds,
        }
    }

    fn elimination(&self) -> BracketLayout {
        let winners = group(self.bracket, |side| side == BracketSide::Winners);
        let losers = group(self.bracket, |side| side == BracketSide::Losers);
        let third_place: Vec<&BracketMatch> = self
            .bracket
            .matches
            .iter()
            .filter(|m| m.side == BracketSide::ThirdPlace)
            .collect();
        let grand_final: Vec<&BracketMatch> = self
            .bracket
            .matches
            .iter()
            .filter(|m| m.side == BracketSide::GrandFinal)
            .collect();

        let winner_rows = winners
            .values()
            .map(|matches| matches.len() as u32)
            .max()
            .unwrap_or(1);
        let mut rounds = Vec::new();
        let mut columns = 0u32;
        let mut final_x = 0u32;

        for (round, matches) in &winners {
            let x = self.column_x(columns);
            final_x = x;
            rounds.push(RoundLayout {
                round: *round,
                name: round_name(self.bracket, BracketSide::Winners, *round),
                x,
                matches: self.column(matches, x, 0, winner_rows),
            });
            columns += 1;
        }

        let mut height = self.section_height(winner_rows);

        if let Some(first) = third_place.first() {
            let top = winner_rows * self.row_unit();
            rounds.push(RoundLayout {
                round: first.round,
                name: round_name(self.bracket, BracketSide::ThirdPlace, first.round),
                x: final_x,
                matches: self.column(&third_place, final_x, top, 1),
            });
            height = top + self.section_height(1);
        }

        if let Some(first) = grand_final.first() {
            let x = self.column_x(columns);
            rounds.push(RoundLayout {
                round: first.round,
                name: round_name(self.bracket, BracketSide::GrandFinal, first.round),
                x,
                matches: self.column(&grand_final, x, 0, winner_rows),
            });
            columns += 1;
        }

        if !losers.is_empty() {
            let top = height + 2 * self.options.row_gap + self.options.match_height / 2;
            let loser_rows = losers
                .values()
                .map(|matches| matches.len() as u32)
                .max()
                .unwrap_or(1);
            // Losers rounds are keyed by negative numbers; draw them left to right from -1.
            for ((round, matches), column) in losers.iter().rev().zip(0u32..) {
                let x = self.column_x(column);
                rounds.push(RoundLayout {
                    round: *round,
                    name: round_name(self.bracket, BracketSide::Losers, *round),
                    x,
                    matches: self.column(matches, x, top, loser_rows),
                });
                columns = columns.max(column + 1);
            }
            height = top + self.section_height(loser_rows);
        }

        BracketLayout {
            width: self.width_for(columns),
            height,
            rounds,
        }
    }
}

/// Matches of the selected sides grouped by round, rounds in ascending order.
fn group(
    bracket: &Bracket,
    keep: impl Fn(BracketSide) -> bool,
) -> BTreeMap<i32, Vec<&BracketMatch>> {
    let mut rounds: BTreeMap<i32, Vec<&BracketMatch>> = BTreeMap::new();
    for m in bracket.matches.iter().filter(|m| keep(m.side)) {
        rounds.entry(m.round).or_default().push(m);
    }
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::engine::{EngineOptions, generate};

    fn names(n: u64) -> HashMap<u64, String> {
        (1..=n).map(|id| (id, format!("P{id}"))).collect()
    }

    fn layout(format: TournamentType, n: u64, third_place_match: bool) -> (Bracket, BracketLayout) {
        let entrants: Vec<u64> = (1..=n).collect();
        let bracket = generate(format, &entrants, EngineOptions { third_place_match }).unwrap();
        let layout = render(&bracket, &names(n), &LayoutOptions::default());
        (bracket, layout)
    }

    #[test]
    fn eight_player_single_elimination_columns() {
        let (_, layout) = layout(TournamentType::SingleElimination, 8, false);
        let names: Vec<&str> = layout.rounds.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Quarterfinals", "Semifinals", "Finals"]);
        assert_eq!(layout.rounds[0].x, 0);
        assert_eq!(layout.rounds[1].x, 248);
        assert_eq!(layout.width, 3 * 200 + 2 * 48);
        assert_eq!(layout.height, 4 * 72);
        assert_eq!(layout.rounds[0].matches[0].player1, "P1");
        assert_eq!(layout.rounds[0].matches[0].player2, "P8");
        assert_eq!(layout.rounds[2].matches[0].player1, "Winner of E");
    }

    #[test]
    fn later_rounds_are_centered_between_feeders() {
        let (_, layout) = layout(TournamentType::SingleElimination, 4, false);
        let first = &layout.rounds[0].matches;
        let final_match = &layout.rounds[1].matches[0];
        let middle = (first[0].y + first[1].y) / 2;
        assert_eq!(final_match.y, middle);
    }

    #[test]
    fn third_place_sits_under_the_final() {
        let (_, layout) = layout(TournamentType::SingleElimination, 4, true);
        let third = layout
            .rounds
            .iter()
            .find(|r| r.name == "Third Place")
            .unwrap();
        let finals = layout.rounds.iter().find(|r| r.name == "Finals").unwrap();
        assert_eq!(third.x, finals.x);
        assert!(third.matches[0].y > finals.matches[0].y);
        assert_eq!(third.matches[0].player1, "Loser of A");
        assert!(layout.height >= third.matches[0].y + third.matches[0].height);
    }

    #[test]
    fn double_elimination_names_and_sections() {
        let (_, layout) = layout(TournamentType::DoubleElimination, 8, false);
        let names: Vec<&str> = layout.rounds.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Winners Finals"));
        assert!(names.contains(&"Grand Finals"));
        assert!(names.contains(&"Losers Round 1"));
        assert!(names.contains(&"Losers Finals"));

        let winners_bottom = layout
            .rounds
            .iter()
            .filter(|r| r.round > 0)
            .flat_map(|r| r.matches.iter())
            .map(|m| m.y + m.height)
            .max()
            .unwrap();
        let losers_top = layout
            .rounds
            .iter()
            .filter(|r| r.round < 0)
            .flat_map(|r| r.matches.iter())
            .map(|m| m.y)
            .min()
            .unwrap();
        assert!(losers_top > winners_bottom);
    }

    #[test]
    fn round_robin_uses_one_column_per_round() {
        let (bracket, layout) = layout(TournamentType::RoundRobin, 4, false);
        assert_eq!(layout.rounds.len(), 3);
        assert_eq!(layout.rounds[2].name, "Round 3");
        let boxes: usize = layout.rounds.iter().map(|r| r.matches.len()).sum();
        assert_eq!(boxes, bracket.matches.len());
    }
}
