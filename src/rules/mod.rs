//! Go rules engine.
//!
//! - `board`: points, stones, colors, moves, the board grid
//! - `engine`: neighbors, groups, liberties, move legality, capture, ko
//! - `territory`: area-score analysis and dead-stone estimate of a finished position
//!
//! Nothing in this module holds state between calls.

pub mod board;
pub mod engine;
pub mod territory;

pub use board::{BoardState, Color, Move, Point, Stone, SUPPORTED_SIZES};
pub use engine::{
    find_group, get_all_liberties, neighbors, process_move, replay, Group, KoInfo, MoveOptions,
    MoveOutcome,
};
pub use territory::{analyze, estimate_dead_stones, AnalysisInput, ColorScore, ScoreResult};
