//! Gold and item rewards.
//!
//! Rolling and committing are separate steps. A roll is pure chance; the
//! commit either writes the whole roll into the player's record or writes
//! nothing and reports why.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::ScoringConfig;
use super::rating::Outcome;
use crate::core::{GameMode, RandomSource};

/// Items a player holds, bounded by a slot capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Item ids, one per occupied slot.
    pub items: Vec<String>,
    /// Slot count.
    pub capacity: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(50)
    }
}

impl Inventory {
    /// Empty inventory with `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Unused slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    /// Add every item or none of them.
    pub fn add_all(&mut self, items: &[String]) -> Result<(), WithholdReason> {
        if items.len() > self.free_slots() {
            return Err(WithholdReason::InventoryOverflow);
        }
        self.items.extend_from_slice(items);
        Ok(())
    }
}

/// Rolled, not yet committed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRoll {
    pub gold: u32,
    pub items: Vec<String>,
}

/// Why a reward was not granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithholdReason {
    /// Not enough free inventory slots.
    InventoryOverflow,
}

/// What happened to a player's rewards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardOutcome {
    /// Everything was written.
    Granted { gold: u32, items: Vec<String> },
    /// Nothing was written.
    Withheld {
        gold: u32,
        items: Vec<String>,
        reason: WithholdReason,
    },
    /// No rewards for this match (no contest, engine seat).
    None,
}

/// Roll gold and a possible item drop.
///
/// Items only drop on a win; the chance is scaled by the player's loot bonus.
pub fn roll_rewards<R: RandomSource + ?Sized>(
    cfg: &ScoringConfig,
    mode: GameMode,
    outcome: Outcome,
    loot_bonus_percent: u32,
    rng: &mut R,
) -> RewardRoll {
    let gold = (f64::from(cfg.gold.get(outcome)) * cfg.mode_weights.for_mode(mode)).round() as u32;

    let mut items = Vec::new();
    if outcome == Outcome::Win {
        let chance = cfg.drop_chance * (1.0 + f64::from(loot_bonus_percent) / 100.0);
        if rng.chance(chance) {
            let weights: Vec<f64> = cfg.items.iter().map(|i| i.weight).collect();
            if let Some(index) = rng.choose_weighted(&weights) {
                items.push(cfg.items[index].item_id.clone());
            }
        }
    }

    debug!(gold, items = items.len(), ?outcome, "rewards rolled");
    RewardRoll { gold, items }
}

/// Write a roll into a player's gold and inventory, all or nothing.
pub fn commit(gold: &mut u64, inventory: &mut Inventory, roll: RewardRoll) -> RewardOutcome {
    match inventory.add_all(&roll.items) {
        Ok(()) => {
            *gold += u64::from(roll.gold);
            RewardOutcome::Granted {
                gold: roll.gold,
                items: roll.items,
            }
        }
        Err(reason) => RewardOutcome::Withheld {
            gold: roll.gold,
            items: roll.items,
            reason,
        },
    }
}
