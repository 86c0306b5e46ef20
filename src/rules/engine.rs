//! Go rules: neighbors, groups, liberties, move legality, capture, ko.
//!
//! Everything here is a pure function of its arguments. Groups are derived
//! on demand and never cached across moves.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

use super::board::{BoardState, Color, Move, Point, Stone};
use crate::core::MoveRejection;

/// Single point forbidden for immediate recapture.
///
/// Created by the move at ply `turn`; only the move at ply `turn + 1` is
/// restricted by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KoInfo {
    /// Point that may not be played.
    pub point: Point,
    /// Ply index of the capturing move.
    pub turn: u32,
}

/// Connected stones of one color and their liberties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    /// Color of every stone in the group.
    pub color: Color,
    /// Member stones, in discovery order.
    pub stones: Vec<Point>,
    /// Empty points adjacent to the group.
    pub liberties: FxHashSet<Point>,
}

impl Group {
    /// Number of distinct liberties.
    #[must_use]
    pub fn liberty_count(&self) -> usize {
        self.liberties.len()
    }
}

/// Options for [`process_move`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// Accept placements that leave the placed group without liberties.
    /// Used for setup-time placement only.
    pub ignore_suicide: bool,
}

/// Result of an accepted move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Board after placement and captures.
    pub board: BoardState,
    /// Points whose stones were removed.
    pub captured: Vec<Point>,
    /// Ko restriction for the next ply, if this move created one.
    pub ko: Option<KoInfo>,
}

/// Up to four orthogonal in-bounds neighbors.
#[must_use]
pub fn neighbors(p: Point, size: usize) -> SmallVec<[Point; 4]> {
    let n = size as i32;
    let mut out = SmallVec::new();
    for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
        let q = Point::new(p.x + dx, p.y + dy);
        if (0..n).contains(&q.x) && (0..n).contains(&q.y) {
            out.push(q);
        }
    }
    out
}

/// Breadth-first group discovery from `(x, y)`.
///
/// Returns `None` if the origin does not hold a stone of `color`.
#[must_use]
pub fn find_group(p: Point, color: Color, board: &BoardState) -> Option<Group> {
    let stone = color.stone();
    if !board.in_bounds(p) || board.get(p) != stone {
        return None;
    }

    let mut stones = Vec::new();
    let mut liberties = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::from([p]);
    visited.insert(p);

    while let Some(current) = queue.pop_front() {
        stones.push(current);
        for n in neighbors(current, board.size()) {
            match board.get(n) {
                Stone::Empty => {
                    liberties.insert(n);
                }
                s if s == stone && visited.insert(n) => queue.push_back(n),
                _ => {}
            }
        }
    }

    Some(Group {
        color,
        stones,
        liberties,
    })
}

/// Union of the empty neighbors of every stone of `color`, sorted.
#[must_use]
pub fn get_all_liberties(color: Color, board: &BoardState) -> Vec<Point> {
    let mut set = FxHashSet::default();
    for p in board.stones_of(color) {
        for n in neighbors(p, board.size()) {
            if board.get(n) == Stone::Empty {
                set.insert(n);
            }
        }
    }
    let mut out: Vec<Point> = set.into_iter().collect();
    out.sort_unstable_by_key(|p| (p.y, p.x));
    out
}

/// Validate and apply a move.
///
/// `ply_index` is the index of this move in the game's move sequence; ko
/// created at ply `k` restricts only ply `k + 1`. The input board is never
/// modified; on rejection the caller keeps its original board.
pub fn process_move(
    board: &BoardState,
    mv: &Move,
    ko: Option<&KoInfo>,
    ply_index: u32,
    options: MoveOptions,
) -> Result<MoveOutcome, MoveRejection> {
    if mv.is_pass() {
        return Ok(MoveOutcome {
            board: board.clone(),
            captured: Vec::new(),
            ko: None,
        });
    }

    let p = mv.point;
    if !board.in_bounds(p) {
        return Err(MoveRejection::OffBoard);
    }
    if board.get(p) != Stone::Empty {
        return Err(MoveRejection::Occupied);
    }
    if let Some(ko) = ko {
        if ko.point == p && ko.turn + 1 == ply_index {
            return Err(MoveRejection::Ko);
        }
    }

    let mut next = board.clone();
    next.set(p, mv.player.stone());

    let opponent = mv.player.opponent();
    let mut captured: Vec<Point> = Vec::new();
    for n in neighbors(p, next.size()) {
        // A stone already removed in this pass reads as empty and is skipped.
        if let Some(group) = find_group(n, opponent, &next) {
            if group.liberty_count() == 0 {
                for s in &group.stones {
                    next.set(*s, Stone::Empty);
                }
                captured.extend(group.stones);
            }
        }
    }

    let own = find_group(p, mv.player, &next);
    if captured.is_empty() && !options.ignore_suicide {
        if own.as_ref().map_or(true, |g| g.liberty_count() == 0) {
            return Err(MoveRejection::Suicide);
        }
    }

    let new_ko = match (captured.as_slice(), own.as_ref()) {
        ([single], Some(group))
            if group.stones.len() == 1
                && group.liberty_count() == 1
                && group.liberties.contains(single) =>
        {
            Some(KoInfo {
                point: *single,
                turn: ply_index,
            })
        }
        _ => None,
    };

    Ok(MoveOutcome {
        board: next,
        captured,
        ko: new_ko,
    })
}

/// Replay a sequence of moves from an initial board, returning the final
/// board and ko state. Stops at the first rejected move.
pub fn replay(
    initial: &BoardState,
    moves: impl IntoIterator<Item = Move>,
) -> Result<(BoardState, Option<KoInfo>), (usize, MoveRejection)> {
    let mut board = initial.clone();
    let mut ko = None;
    for (ply, mv) in moves.into_iter().enumerate() {
        let outcome = process_move(&board, &mv, ko.as_ref(), ply as u32, MoveOptions::default())
            .map_err(|e| (ply, e))?;
        board = outcome.board;
        ko = outcome.ko;
    }
    Ok((board, ko))
}
