//! Scoring and reward parameters.

use serde::{Deserialize, Serialize};

use super::rating::Outcome;
use crate::core::GameMode;

/// Per-outcome amounts (XP, gold).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeTable {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl OutcomeTable {
    /// Amount for an outcome.
    #[must_use]
    pub fn get(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Win => self.win,
            Outcome::Draw => self.draw,
            Outcome::Loss => self.loss,
        }
    }
}

/// Reward weight per game mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeWeights {
    pub standard: f64,
    pub base: f64,
    pub speed: f64,
    pub capture: f64,
    pub survival: f64,
}

impl Default for ModeWeights {
    fn default() -> Self {
        Self {
            standard: 1.0,
            base: 1.2,
            speed: 0.8,
            capture: 0.6,
            survival: 0.6,
        }
    }
}

impl ModeWeights {
    /// Weight for a mode.
    #[must_use]
    pub fn for_mode(&self, mode: GameMode) -> f64 {
        match mode {
            GameMode::Standard => self.standard,
            GameMode::Base => self.base,
            GameMode::Speed => self.speed,
            GameMode::Capture { .. } => self.capture,
            GameMode::Survival { .. } => self.survival,
        }
    }
}

/// One entry of the item drop table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item identifier.
    pub item_id: String,
    /// Relative weight.
    pub weight: f64,
}

impl ItemDrop {
    pub fn new(item_id: impl Into<String>, weight: f64) -> Self {
        Self {
            item_id: item_id.into(),
            weight,
        }
    }
}

/// Configuration for the end-of-match orchestrator.
///
/// Defaults give a playable balance; hosts are expected to load their own
/// tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Elo K-factor.
    pub rating_k: f64,
    /// Rating taken from the initiator of a no-contest.
    pub no_contest_rating_penalty: i32,
    /// Manner taken from the initiator of a no-contest.
    pub no_contest_manner_penalty: i32,
    /// Manner taken for disconnecting while behind.
    pub disconnect_manner_penalty: i32,

    /// Base XP by outcome.
    pub xp: OutcomeTable,
    /// XP multiplier change per level of difference to the opponent.
    pub level_multiplier_slope: f64,
    /// Bounds of the level multiplier.
    pub level_multiplier_range: (f64, f64),
    /// XP needed per level: level N needs `N * xp_per_level`.
    pub xp_per_level: u32,

    /// Base gold by outcome.
    pub gold: OutcomeTable,
    /// Weight applied to XP and gold per mode.
    pub mode_weights: ModeWeights,
    /// Base item drop chance on a win.
    pub drop_chance: f64,
    /// Weighted item table.
    pub items: Vec<ItemDrop>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rating_k: 32.0,
            no_contest_rating_penalty: 15,
            no_contest_manner_penalty: 5,
            disconnect_manner_penalty: 3,
            xp: OutcomeTable {
                win: 100,
                draw: 50,
                loss: 30,
            },
            level_multiplier_slope: 0.1,
            level_multiplier_range: (0.5, 1.5),
            xp_per_level: 100,
            gold: OutcomeTable {
                win: 50,
                draw: 20,
                loss: 10,
            },
            mode_weights: ModeWeights::default(),
            drop_chance: 0.2,
            items: vec![
                ItemDrop::new("stone_polish", 60.0),
                ItemDrop::new("bowl_lid", 30.0),
                ItemDrop::new("kaya_board", 10.0),
            ],
        }
    }
}

impl ScoringConfig {
    /// Set the no-contest penalties.
    #[must_use]
    pub fn with_no_contest_penalties(mut self, rating: i32, manner: i32) -> Self {
        self.no_contest_rating_penalty = rating;
        self.no_contest_manner_penalty = manner;
        self
    }

    /// Set the item drop chance.
    #[must_use]
    pub fn with_drop_chance(mut self, chance: f64) -> Self {
        self.drop_chance = chance;
        self
    }

    /// Replace the item table.
    #[must_use]
    pub fn with_items(mut self, items: Vec<ItemDrop>) -> Self {
        self.items = items;
        self
    }

    /// Set XP per level.
    #[must_use]
    pub fn with_xp_per_level(mut self, xp: u32) -> Self {
        self.xp_per_level = xp.max(1);
        self
    }
}
