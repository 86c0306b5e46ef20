//! Actions submitted from outside the core, and the move log.
//!
//! Every input is a variant of [`PlayerAction`]; the phase dispatcher matches
//! it exhaustively against the current phase. Actions addressed to the wrong
//! phase are rejected, never queued.
//!
//! ```
//! use rust_baduk::core::PlayerAction;
//!
//! let action: PlayerAction =
//!     serde_json::from_str(r#"{"type":"PLACE_STONE","x":3,"y":4}"#).unwrap();
//! assert_eq!(action, PlayerAction::PlaceStone { x: 3, y: 4 });
//! ```

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::rules::{Color, Move};

/// One player's komi-auction proposal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Color the player wants.
    pub color: Color,
    /// Komi offered for it.
    pub komi: u32,
}

impl Default for Bid {
    /// Bid assigned to a player who never submitted one.
    fn default() -> Self {
        Self {
            color: Color::Black,
            komi: 0,
        }
    }
}

/// Inputs accepted from players and the transport layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerAction {
    /// Place one hidden base stone.
    PlaceBaseStone {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// Fill the remaining base stones randomly.
    PlaceRemainingBaseStonesRandomly,
    /// Submit the komi bid (once per round).
    UpdateKomiBid {
        /// The bid.
        bid: Bid,
    },
    /// Acknowledge the revealed base board.
    ConfirmBaseReveal,
    /// Play a stone.
    PlaceStone {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// Pass the turn.
    Pass,
    /// Resign the match.
    Resign,
    /// Transport reports the player disconnected.
    Disconnect,
}

impl PlayerAction {
    /// Name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PlayerAction::PlaceBaseStone { .. } => "PLACE_BASE_STONE",
            PlayerAction::PlaceRemainingBaseStonesRandomly => "PLACE_REMAINING_BASE_STONES_RANDOMLY",
            PlayerAction::UpdateKomiBid { .. } => "UPDATE_KOMI_BID",
            PlayerAction::ConfirmBaseReveal => "CONFIRM_BASE_REVEAL",
            PlayerAction::PlaceStone { .. } => "PLACE_STONE",
            PlayerAction::Pass => "PASS",
            PlayerAction::Resign => "RESIGN",
            PlayerAction::Disconnect => "DISCONNECT",
        }
    }
}

/// An accepted move in the play log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Seat that moved.
    pub player: PlayerId,
    /// The move.
    pub mv: Move,
    /// Ply index (0-based position in the log).
    pub ply: u32,
    /// Stones captured by the move.
    pub captured: u32,
}

impl MoveRecord {
    /// Create a record.
    #[must_use]
    pub fn new(player: PlayerId, mv: Move, ply: u32, captured: u32) -> Self {
        Self {
            player,
            mv,
            ply,
            captured,
        }
    }
}
