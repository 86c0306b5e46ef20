//! End-of-match scoring and rewards.
//!
//! - [`rating`]: logistic expected-score model
//! - [`progression`]: XP gain and level-ups
//! - [`rewards`]: gold/item rolls and all-or-nothing inventory commits
//! - [`summary`]: per-player before/after reports
//! - [`orchestrator`]: counting, the result, and settling each player

pub mod config;
pub mod orchestrator;
pub mod progression;
pub mod rating;
pub mod rewards;
pub mod summary;

pub use config::{ItemDrop, ModeWeights, OutcomeTable, ScoringConfig};
pub use orchestrator::{compute_score, decide, end_session, finish, is_losing};
pub use progression::{apply_xp, level_multiplier, required_xp, xp_gain, LevelProgress};
pub use rating::{expected_score, rating_delta, Outcome};
pub use rewards::{commit, roll_rewards, Inventory, RewardOutcome, RewardRoll, WithholdReason};
pub use summary::{PlayerStats, PlayerSummary};
