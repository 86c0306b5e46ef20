//! Error taxonomy for session-level operations.
//!
//! Rule violations and phase mismatches are local and synchronous: the
//! rejected action never mutates the session. Engine faults are wrapped
//! unchanged so callers can tell a recoverable protocol fault from an
//! unavailable process.

use thiserror::Error;

use super::state::Phase;
use crate::engine::EngineError;

/// Why the rules engine refused a stone placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// Point is outside the board.
    #[error("point is off the board")]
    OffBoard,
    /// Point already holds a stone.
    #[error("point is occupied")]
    Occupied,
    /// Immediate recapture of a ko.
    #[error("ko: immediate recapture is forbidden")]
    Ko,
    /// Placement leaves the placed group without liberties and captures nothing.
    #[error("suicide is not allowed")]
    Suicide,
}

/// Failure of the persistence layer.
#[derive(Clone, Debug, Error)]
pub enum StoreError {
    /// Record could not be encoded or decoded.
    #[error("record codec failed for '{key}': {message}")]
    Codec { key: String, message: String },
    /// Backing store refused the operation.
    #[error("store backend failed for '{key}': {message}")]
    Backend { key: String, message: String },
    /// Required record is missing.
    #[error("record not found: {key}")]
    NotFound { key: String },
}

impl StoreError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Codec { .. } => "STORE_CODEC",
            Self::Backend { .. } => "STORE_BACKEND",
            Self::NotFound { .. } => "STORE_NOT_FOUND",
        }
    }
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Stone placement refused by the rules engine.
    #[error("invalid move: {0}")]
    InvalidMove(#[from] MoveRejection),

    /// Action addressed to a phase the session is not in.
    #[error("action requires phase {expected:?}, session is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Move submitted out of turn.
    #[error("it is not this player's turn")]
    NotYourTurn,

    /// User does not hold a seat in the session.
    #[error("user is not a participant in this session")]
    NotAParticipant,

    /// One-shot submission already made (komi bid, confirmation).
    #[error("already submitted for this phase")]
    AlreadySubmitted,

    /// Action payload is malformed for the current phase.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Unknown session id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session id already registered.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(String),

    /// Engine bridge failure that survived resync.
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),

    /// Persistence failure.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMove(MoveRejection::OffBoard) => "MOVE_OFF_BOARD",
            Self::InvalidMove(MoveRejection::Occupied) => "MOVE_OCCUPIED",
            Self::InvalidMove(MoveRejection::Ko) => "MOVE_KO",
            Self::InvalidMove(MoveRejection::Suicide) => "MOVE_SUICIDE",
            Self::WrongPhase { .. } => "WRONG_PHASE",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::NotAParticipant => "NOT_A_PARTICIPANT",
            Self::AlreadySubmitted => "ALREADY_SUBMITTED",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionAlreadyExists(_) => "SESSION_EXISTS",
            Self::Engine(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
