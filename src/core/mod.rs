//! Core types: seats, ids, RNG, configuration, actions, errors, the session
//! aggregate.
//!
//! Everything the phase machine, the engine bridge and the scoring
//! orchestrator share lives here.

pub mod action;
pub mod config;
pub mod error;
pub mod ids;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{Bid, MoveRecord, PlayerAction};
pub use config::{GameMode, PhaseDurations, SessionConfig};
pub use error::{GameError, MoveRejection, StoreError};
pub use ids::{SessionId, UserId};
pub use player::{PlayerId, PlayerMap, SEAT_COUNT};
pub use rng::{GameRng, GameRngState, RandomSource};
pub use state::{
    BasePlacement, EndTrigger, GameSession, KomiAuction, KomiResolution, Phase, PlayerKind,
    PlayerSlot, WinReason,
};
