//! Base-stone placement: hidden simultaneous setup stones.
//!
//! Each seat claims up to `base_stones` points without seeing the other
//! seat's claims. When the phase closes, points claimed by both seats are
//! dropped from both lists, then the remaining stones are laid on a scratch
//! board and every group left without liberties is removed as well.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::core::{GameError, GameSession, Phase, PlayerId, PlayerMap, RandomSource};
use crate::rules::{find_group, BoardState, Color, Point, Stone};

/// Claim one point for `seat`.
pub fn place_base_stone(session: &mut GameSession, seat: PlayerId, p: Point) -> Result<(), GameError> {
    ensure_phase(session)?;
    let target = session.config.base_stones;
    let size = session.config.board_size as i32;
    let own = &mut session.base.stones[seat];

    if !(0..size).contains(&p.x) || !(0..size).contains(&p.y) {
        return Err(GameError::InvalidMove(crate::core::MoveRejection::OffBoard));
    }
    if own.len() >= target {
        return Err(GameError::InvalidAction(format!("all {target} base stones already placed")));
    }
    if own.contains(&p) {
        return Err(GameError::InvalidMove(crate::core::MoveRejection::Occupied));
    }

    own.push(p);
    Ok(())
}

/// Fill `seat`'s shortfall with uniformly random points. Returns how many
/// stones were added.
pub fn place_remaining_randomly<R: RandomSource + ?Sized>(
    session: &mut GameSession,
    seat: PlayerId,
    rng: &mut R,
) -> usize {
    let target = session.config.base_stones;
    let size = session.config.board_size;
    let attempts = session.config.auto_fill_attempts;
    auto_fill(&mut session.base.stones[seat], target, size, attempts, rng)
}

/// Add random distinct points to `stones` until it holds `target` of them.
///
/// A draw that hits an already-claimed point is retried; after `attempts`
/// total draws the fill gives up and returns what it managed.
pub fn auto_fill<R: RandomSource + ?Sized>(
    stones: &mut Vec<Point>,
    target: usize,
    size: usize,
    attempts: usize,
    rng: &mut R,
) -> usize {
    let before = stones.len();
    let mut taken: FxHashSet<Point> = stones.iter().copied().collect();
    let mut draws = 0;

    while stones.len() < target && draws < attempts {
        draws += 1;
        let p = Point::new(rng.next_index(size) as i32, rng.next_index(size) as i32);
        if taken.insert(p) {
            stones.push(p);
        }
    }

    stones.len() - before
}

/// Have both seats placed their full allotment?
#[must_use]
pub fn placement_complete(session: &GameSession) -> bool {
    let target = session.config.base_stones;
    session.base.stones.all(|s| s.len() >= target)
}

/// Mutual elimination of simultaneously placed stones.
///
/// Seat 0's stones are laid as Black and seat 1's as White on the scratch
/// board; the color choice does not matter, only that the seats differ.
#[must_use]
pub fn resolve_overlaps(stones: &PlayerMap<Vec<Point>>, size: usize) -> PlayerMap<Vec<Point>> {
    let first: FxHashSet<Point> = stones[PlayerId::FIRST].iter().copied().collect();
    let second: FxHashSet<Point> = stones[PlayerId::SECOND].iter().copied().collect();

    let mut survivors = stones.map(|seat, list| {
        let other = if seat == PlayerId::FIRST { &second } else { &first };
        list.iter().copied().filter(|p| !other.contains(p)).collect::<Vec<_>>()
    });

    let scratch = lay_out(&survivors, &PlayerMap::from_pair(Color::Black, Color::White), size);

    // Collect every dead group before removing any, so elimination is
    // simultaneous and never cascades.
    let mut dead: FxHashSet<Point> = FxHashSet::default();
    for (seat, color) in [(PlayerId::FIRST, Color::Black), (PlayerId::SECOND, Color::White)] {
        for p in &survivors[seat] {
            if dead.contains(p) {
                continue;
            }
            if let Some(group) = find_group(*p, color, &scratch) {
                if group.liberty_count() == 0 {
                    dead.extend(group.stones);
                }
            }
        }
    }

    if !dead.is_empty() {
        debug!(removed = dead.len(), "base stones without liberties removed");
    }
    for (_, list) in survivors.iter_mut() {
        list.retain(|p| !dead.contains(p));
    }
    survivors
}

/// Board holding every seat's stones in that seat's color.
#[must_use]
pub fn lay_out(stones: &PlayerMap<Vec<Point>>, colors: &PlayerMap<Color>, size: usize) -> BoardState {
    let mut board = BoardState::new(size);
    for (seat, list) in stones.iter() {
        let stone: Stone = colors[seat].stone();
        for p in list {
            board.set(*p, stone);
        }
    }
    board
}

/// Is the session accepting placement actions?
pub(crate) fn ensure_phase(session: &GameSession) -> Result<(), GameError> {
    if session.phase == Phase::BasePlacement {
        Ok(())
    } else {
        Err(GameError::WrongPhase {
            expected: Phase::BasePlacement,
            actual: session.phase,
        })
    }
}
