//! # rust-baduk
//!
//! Match core for turn-based Go and Go variants.
//!
//! ## Design Principles
//!
//! 1. **Pure rules**: the rules engine is a set of deterministic functions
//!    over a board; nothing is cached between moves.
//!
//! 2. **Whole-record transitions**: a session is a fully-initialized record.
//!    Actions and deadline sweeps produce a new record or an error, never a
//!    half-applied one.
//!
//! 3. **Single writer per session**: every mutation of a session runs under
//!    its own lock; sessions never wait on each other.
//!
//! 4. **Replayable chance**: randomness goes through an injectable source,
//!    and sessions carry a seeded RNG position.
//!
//! ## Architecture
//!
//! - **Phase machine**: `BasePlacement -> KomiBidding -> KomiBidReveal ->
//!   BaseGameStartConfirmation -> Playing -> Scoring -> Ended | NoContest`,
//!   driven by player actions and by a sweep over absolute deadlines.
//!
//! - **Engine bridge**: one external GTP-style engine process per AI-backed
//!   session, with a FIFO single-in-flight command queue, per-command
//!   timeouts and resync-by-replay on protocol faults.
//!
//! - **Orchestrator**: counts the final position and settles rating, XP,
//!   manner, counters and rewards into persisted player records.
//!
//! ## Modules
//!
//! - `core`: seats, ids, RNG, configuration, actions, errors, the session
//! - `rules`: board, move legality, capture, ko, area scoring
//! - `session`: base placement, komi auction, dispatcher and sweep, registry
//! - `engine`: vertex codec, connection, launcher, bridge
//! - `scoring`: rating, progression, rewards, summaries, orchestrator
//! - `store`: key-value persistence of users and archived sessions
//! - `service`: the async `MatchService`

pub mod core;
pub mod engine;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use crate::core::{
    Bid, EndTrigger, GameError, GameMode, GameRng, GameRngState, GameSession, MoveRejection,
    Phase, PlayerAction, PlayerId, PlayerMap, PlayerSlot, RandomSource, SessionConfig, SessionId,
    UserId, WinReason,
};

pub use crate::rules::{
    analyze, find_group, get_all_liberties, neighbors, process_move, BoardState, Color, KoInfo,
    Move, MoveOptions, MoveOutcome, Point, ScoreResult, Stone,
};

pub use crate::session::{apply_action, sweep, SessionRegistry};

pub use crate::engine::{
    EngineBridge, EngineConfig, EngineConnection, EngineError, EngineLauncher, EngineSetup,
    GoalContext, ProcessLauncher,
};

pub use crate::scoring::{end_session, PlayerSummary, RewardOutcome, ScoringConfig};

pub use crate::store::{KvStore, MemoryStore, UserRecord};

pub use crate::service::{ArenaConfig, MatchService, NewSession};
