//! Session configuration.
//!
//! A `SessionConfig` fixes everything about a match that does not change once
//! it forms: mode, board, komi, setup parameters, phase durations and clocks.

use serde::{Deserialize, Serialize};

use super::error::GameError;
use crate::rules::SUPPORTED_SIZES;

/// Match variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Plain game, scored by area at two passes.
    Standard,
    /// Hidden simultaneous base-stone placement plus a komi auction before play.
    Base,
    /// Short main time; remaining time converts into bonus points.
    Speed,
    /// First player to capture `target` stones wins.
    Capture {
        /// Captures needed to win.
        target: u32,
    },
    /// White must capture `capture_target` stones within `white_turn_limit`
    /// of its own moves; otherwise Black survives.
    Survival {
        /// White moves allowed.
        white_turn_limit: u32,
        /// Captures White needs.
        capture_target: u32,
    },
}

impl GameMode {
    /// Does the match start with the base-placement setup phases?
    #[must_use]
    pub fn has_setup_phases(self) -> bool {
        matches!(self, GameMode::Base)
    }

    /// Restricted objective modes: an engine may not pass before the
    /// objective is settled.
    #[must_use]
    pub fn is_objective_mode(self) -> bool {
        matches!(self, GameMode::Capture { .. } | GameMode::Survival { .. })
    }

    /// Short stable name, used as a key in scoring tables and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GameMode::Standard => "standard",
            GameMode::Base => "base",
            GameMode::Speed => "speed",
            GameMode::Capture { .. } => "capture",
            GameMode::Survival { .. } => "survival",
        }
    }
}

/// Length of each deadline-driven phase, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    /// Base-stone placement window.
    pub placement_secs: u32,
    /// Komi bid window (per round).
    pub bidding_secs: u32,
    /// How long the auction result is displayed.
    pub reveal_secs: u32,
    /// Window to confirm the revealed base board.
    pub confirmation_secs: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            placement_secs: 30,
            bidding_secs: 30,
            reveal_secs: 5,
            confirmation_secs: 30,
        }
    }
}

/// Everything fixed at match formation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Match variant.
    pub mode: GameMode,

    /// Board side length, one of 9, 11, 13, 19.
    pub board_size: usize,

    /// Base komi credited to White.
    pub komi: f64,

    /// Base stones each player places in `Base` mode.
    pub base_stones: usize,

    /// Largest komi a bid may offer.
    pub max_komi_bid: u32,

    /// Ranked matches move ratings.
    pub ranked: bool,

    /// Setup phase lengths.
    pub durations: PhaseDurations,

    /// Main time per player, if the match is clocked.
    pub main_time_secs: Option<u32>,

    /// Seconds of remaining time per bonus point in `Speed` mode.
    pub time_bonus_divisor: u32,

    /// Resigning or disconnecting before this many moves is a no-contest.
    pub min_moves_for_result: usize,

    /// Upper bound on random draws when auto-filling base stones.
    pub auto_fill_attempts: usize,

    /// Manner penalty for a human whose base stones had to be auto-filled.
    pub auto_fill_penalty: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Standard,
            board_size: 19,
            komi: 6.5,
            base_stones: 4,
            max_komi_bid: 50,
            ranked: true,
            durations: PhaseDurations::default(),
            main_time_secs: None,
            time_bonus_divisor: 10,
            min_moves_for_result: 10,
            auto_fill_attempts: 1000,
            auto_fill_penalty: 1,
        }
    }
}

impl SessionConfig {
    /// Config for a mode with its usual board and clock.
    #[must_use]
    pub fn for_mode(mode: GameMode) -> Self {
        let base = Self::default();
        match mode {
            GameMode::Standard => base,
            GameMode::Base => base.with_board_size(9).with_mode(mode),
            GameMode::Speed => base.with_board_size(9).with_mode(mode).with_main_time(300),
            GameMode::Capture { .. } | GameMode::Survival { .. } => {
                base.with_board_size(9).with_mode(mode).with_komi(0.5)
            }
        }
    }

    /// Set the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the board size.
    #[must_use]
    pub fn with_board_size(mut self, size: usize) -> Self {
        self.board_size = size;
        self
    }

    /// Set base komi.
    #[must_use]
    pub fn with_komi(mut self, komi: f64) -> Self {
        self.komi = komi;
        self
    }

    /// Set base stones per player.
    #[must_use]
    pub fn with_base_stones(mut self, count: usize) -> Self {
        self.base_stones = count;
        self
    }

    /// Set main time per player.
    #[must_use]
    pub fn with_main_time(mut self, secs: u32) -> Self {
        self.main_time_secs = Some(secs);
        self
    }

    /// Mark the match ranked or casual.
    #[must_use]
    pub fn with_ranked(mut self, ranked: bool) -> Self {
        self.ranked = ranked;
        self
    }

    /// Set the early-abort threshold.
    #[must_use]
    pub fn with_min_moves(mut self, moves: usize) -> Self {
        self.min_moves_for_result = moves;
        self
    }

    /// Set phase durations.
    #[must_use]
    pub fn with_durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = durations;
        self
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), GameError> {
        if !SUPPORTED_SIZES.contains(&self.board_size) {
            return Err(GameError::InvalidAction(format!(
                "board size {} is not one of {:?}",
                self.board_size, SUPPORTED_SIZES
            )));
        }
        if self.mode.has_setup_phases() && self.base_stones * 4 > self.board_size * self.board_size {
            return Err(GameError::InvalidAction(format!(
                "{} base stones do not fit a {}x{} board",
                self.base_stones, self.board_size, self.board_size
            )));
        }
        if self.mode == GameMode::Speed && self.main_time_secs.is_none() {
            return Err(GameError::InvalidAction("speed mode needs a main time".into()));
        }
        if self.time_bonus_divisor == 0 {
            return Err(GameError::InvalidAction("time bonus divisor must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_presets_validate() {
        for mode in [
            GameMode::Standard,
            GameMode::Base,
            GameMode::Speed,
            GameMode::Capture { target: 5 },
            GameMode::Survival {
                white_turn_limit: 20,
                capture_target: 3,
            },
        ] {
            assert!(SessionConfig::for_mode(mode).validate().is_ok(), "{mode:?}");
        }
    }

    #[test]
    fn test_invalid_board_size() {
        let cfg = SessionConfig::default().with_board_size(10);
        assert!(matches!(cfg.validate(), Err(GameError::InvalidAction(_))));
    }

    #[test]
    fn test_speed_requires_clock() {
        let mut cfg = SessionConfig::for_mode(GameMode::Speed);
        cfg.main_time_secs = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_objective_modes() {
        assert!(GameMode::Capture { target: 1 }.is_objective_mode());
        assert!(!GameMode::Speed.is_objective_mode());
        assert!(GameMode::Base.has_setup_phases());
    }

    #[test]
    fn test_serde_round_trip() {
        let cfg = SessionConfig::for_mode(GameMode::Capture { target: 5 });
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
