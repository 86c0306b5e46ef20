//! Per-player result summaries written at session end.

use serde::{Deserialize, Serialize};

use super::rating::Outcome;
use super::rewards::RewardOutcome;
use crate::core::{PlayerId, UserId};
use crate::store::UserRecord;

/// The tracked numbers of a player at one moment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub level: u32,
    pub xp: u32,
    pub rating: i32,
    pub manner: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub gold: u64,
}

impl From<&UserRecord> for PlayerStats {
    fn from(r: &UserRecord) -> Self {
        Self {
            level: r.level,
            xp: r.xp,
            rating: r.rating,
            manner: r.manner,
            wins: r.wins,
            losses: r.losses,
            draws: r.draws,
            gold: r.gold,
        }
    }
}

/// One player's end-of-match report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub user_id: UserId,
    pub seat: PlayerId,
    /// `None` for a no-contest.
    pub outcome: Option<Outcome>,
    pub no_contest: bool,
    pub before: PlayerStats,
    pub after: PlayerStats,
    pub xp_gained: u32,
    pub levels_gained: u32,
    pub rating_delta: i32,
    /// Applied manner change (after the zero floor).
    pub manner_delta: i32,
    pub rewards: RewardOutcome,
}

impl PlayerSummary {
    /// Summary with no changes at all.
    #[must_use]
    pub fn unchanged(record: &UserRecord, seat: PlayerId, outcome: Option<Outcome>, no_contest: bool) -> Self {
        let stats = PlayerStats::from(record);
        Self {
            user_id: record.user_id.clone(),
            seat,
            outcome,
            no_contest,
            before: stats,
            after: stats,
            xp_gained: 0,
            levels_gained: 0,
            rating_delta: 0,
            manner_delta: 0,
            rewards: RewardOutcome::None,
        }
    }

    /// Rewards were rolled but not written.
    #[must_use]
    pub fn rewards_withheld(&self) -> bool {
        matches!(self.rewards, RewardOutcome::Withheld { .. })
    }
}
