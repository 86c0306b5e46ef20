//! Area-score analysis of a finished position.
//!
//! Empty regions whose border touches only one color belong to that color.
//! Dead stones (as judged by an external engine, when available) are removed
//! first and credited to the opponent as captures.
//!
//! Without an engine, [`estimate_dead_stones`] gives a local judgement: a
//! group is dead when it has no eye of its own and the area it can reach is
//! closed off by living opponent groups.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::board::{BoardState, Color, Point, Stone};
use super::engine::{find_group, neighbors};

/// Score breakdown for one color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorScore {
    /// Empty points surrounded by this color.
    pub territory: f64,
    /// Stones this color captured (including dead stones removed at scoring).
    pub captures: f64,
    /// Points converted from remaining clock time.
    pub time_bonus: f64,
    /// Komi credited to this color.
    pub komi: f64,
    /// Sum of the above.
    pub total: f64,
}

impl ColorScore {
    fn recompute(&mut self) {
        self.total = self.territory + self.captures + self.time_bonus + self.komi;
    }
}

/// Final score of a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Black's breakdown.
    pub black: ColorScore,
    /// White's breakdown.
    pub white: ColorScore,
}

impl ScoreResult {
    /// Breakdown for a color.
    #[must_use]
    pub fn for_color(&self, color: Color) -> &ColorScore {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    fn for_color_mut(&mut self, color: Color) -> &mut ColorScore {
        match color {
            Color::Black => &mut self.black,
            Color::White => &mut self.white,
        }
    }

    /// Add a time bonus to one color and refresh its total.
    pub fn add_time_bonus(&mut self, color: Color, points: f64) {
        let score = self.for_color_mut(color);
        score.time_bonus += points;
        score.recompute();
    }

    /// Color with the strictly higher total; `None` on a tie.
    #[must_use]
    pub fn leader(&self) -> Option<Color> {
        if self.black.total > self.white.total {
            Some(Color::Black)
        } else if self.white.total > self.black.total {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Black total minus White total.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.black.total - self.white.total
    }
}

/// Inputs for [`analyze`].
#[derive(Clone, Debug, Default)]
pub struct AnalysisInput<'a> {
    /// Stones captured during play, by color of the capturer.
    pub black_captures: u32,
    /// Stones captured during play by White.
    pub white_captures: u32,
    /// Komi credited to White.
    pub komi: f64,
    /// Stones judged dead at the end of the game.
    pub dead_stones: &'a [Point],
}

/// Compute the area-score breakdown of a position.
#[must_use]
pub fn analyze(board: &BoardState, input: &AnalysisInput<'_>) -> ScoreResult {
    let mut board = board.clone();
    let mut result = ScoreResult::default();
    result.black.captures = f64::from(input.black_captures);
    result.white.captures = f64::from(input.white_captures);
    result.white.komi = input.komi;

    for p in input.dead_stones {
        if let Some(owner) = board.get(*p).color() {
            board.set(*p, Stone::Empty);
            result.for_color_mut(owner.opponent()).captures += 1.0;
        }
    }

    let mut seen: FxHashSet<Point> = FxHashSet::default();
    for start in board.points() {
        if board.get(start) != Stone::Empty || seen.contains(&start) {
            continue;
        }

        let (region, borders) = flood_region(&board, start, &mut seen);
        let owner = match (borders.contains(&Color::Black), borders.contains(&Color::White)) {
            (true, false) => Some(Color::Black),
            (false, true) => Some(Color::White),
            _ => None,
        };
        if let Some(owner) = owner {
            result.for_color_mut(owner).territory += region.len() as f64;
        }
    }

    result.black.recompute();
    result.white.recompute();
    result
}

/// Stones that cannot live in the final position.
///
/// A group is judged dead when
/// - no empty region next to it is bordered by its own color alone, and
/// - the area it reaches through empty points and its own stones is bordered
///   only by opponent groups, each of which does have such a region.
///
/// Groups facing other eyeless groups (seki and unsettled fights) stay
/// alive, as does anything on an otherwise empty board.
#[must_use]
pub fn estimate_dead_stones(board: &BoardState) -> Vec<Point> {
    // Empty regions and the colors bordering each.
    let mut region_of: FxHashMap<Point, usize> = FxHashMap::default();
    let mut region_borders: Vec<FxHashSet<Color>> = Vec::new();
    let mut seen: FxHashSet<Point> = FxHashSet::default();
    for start in board.points() {
        if board.get(start) != Stone::Empty || seen.contains(&start) {
            continue;
        }
        let (region, borders) = flood_region(board, start, &mut seen);
        for p in region {
            region_of.insert(p, region_borders.len());
        }
        region_borders.push(borders);
    }

    // Groups, and whether each owns an eye.
    let mut group_of: FxHashMap<Point, usize> = FxHashMap::default();
    let mut groups = Vec::new();
    for p in board.points() {
        let Some(color) = board.get(p).color() else {
            continue;
        };
        if group_of.contains_key(&p) {
            continue;
        }
        let Some(group) = find_group(p, color, board) else {
            continue;
        };
        let has_eye = group.liberties.iter().any(|lib| {
            region_of
                .get(lib)
                .is_some_and(|r| region_borders[*r].len() == 1 && region_borders[*r].contains(&color))
        });
        for s in &group.stones {
            group_of.insert(*s, groups.len());
        }
        groups.push((group, has_eye));
    }

    let mut dead = Vec::new();
    for (group, has_eye) in &groups {
        if *has_eye {
            continue;
        }
        let enemies = enclosing_groups(board, &group.stones, group.color, &group_of);
        let enclosed = !enemies.is_empty() && enemies.iter().all(|g| groups[*g].1);
        if enclosed {
            dead.extend(group.stones.iter().copied());
        }
    }
    dead.sort_by_key(|p| (p.y, p.x));
    dead
}

/// Opponent groups bordering the area reachable from `stones` without
/// crossing an opponent stone.
fn enclosing_groups(
    board: &BoardState,
    stones: &[Point],
    color: Color,
    group_of: &FxHashMap<Point, usize>,
) -> FxHashSet<usize> {
    let mut enemies = FxHashSet::default();
    let mut seen: FxHashSet<Point> = stones.iter().copied().collect();
    let mut queue: VecDeque<Point> = stones.iter().copied().collect();

    while let Some(p) = queue.pop_front() {
        for n in neighbors(p, board.size()) {
            match board.get(n).color() {
                Some(c) if c != color => {
                    if let Some(g) = group_of.get(&n) {
                        enemies.insert(*g);
                    }
                }
                _ => {
                    if seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
    }
    enemies
}

fn flood_region(
    board: &BoardState,
    start: Point,
    seen: &mut FxHashSet<Point>,
) -> (Vec<Point>, FxHashSet<Color>) {
    let mut borders = FxHashSet::default();
    let mut region = Vec::new();
    let mut queue = VecDeque::from([start]);
    seen.insert(start);

    while let Some(p) = queue.pop_front() {
        region.push(p);
        for n in neighbors(p, board.size()) {
            match board.get(n).color() {
                Some(c) => {
                    borders.insert(c);
                }
                None => {
                    if seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    (region, borders)
}
