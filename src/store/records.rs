//! Persisted player record.

use serde::{Deserialize, Serialize};

use crate::core::UserId;
use crate::scoring::Inventory;

/// Starting rating for new players.
pub const DEFAULT_RATING: i32 = 1500;
/// Starting manner score.
pub const DEFAULT_MANNER: i32 = 100;

/// Everything the orchestrator reads and writes for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub level: u32,
    /// XP toward the next level.
    pub xp: u32,
    pub rating: i32,
    /// Never below zero.
    pub manner: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub gold: u64,
    pub inventory: Inventory,
    /// Percentage added to XP gains.
    pub xp_bonus_percent: u32,
    /// Percentage added to the item drop chance.
    pub loot_bonus_percent: u32,
}

impl UserRecord {
    /// Fresh record for a first-time player.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            level: 1,
            xp: 0,
            rating: DEFAULT_RATING,
            manner: DEFAULT_MANNER,
            wins: 0,
            losses: 0,
            draws: 0,
            gold: 0,
            inventory: Inventory::default(),
            xp_bonus_percent: 0,
            loot_bonus_percent: 0,
        }
    }
}
