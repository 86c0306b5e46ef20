//! XP gain and level progression.
//!
//! ## Formula
//! XP = base(outcome) × mode_weight × level_mult × (1 + bonus% / 100)
//!
//! `level_mult` grows with the opponent's level advantage and is clamped to
//! the configured range.

use super::config::ScoringConfig;
use super::rating::Outcome;
use crate::core::GameMode;

/// Multiplier for playing an opponent of a different level.
#[must_use]
pub fn level_multiplier(player_level: u32, opponent_level: u32, cfg: &ScoringConfig) -> f64 {
    let diff = f64::from(opponent_level) - f64::from(player_level);
    let (low, high) = cfg.level_multiplier_range;
    (1.0 + diff * cfg.level_multiplier_slope).clamp(low, high)
}

/// XP earned for one match.
#[must_use]
pub fn xp_gain(
    cfg: &ScoringConfig,
    mode: GameMode,
    outcome: Outcome,
    player_level: u32,
    opponent_level: u32,
    bonus_percent: u32,
) -> u32 {
    let base = f64::from(cfg.xp.get(outcome)) * cfg.mode_weights.for_mode(mode);
    let scaled = base * level_multiplier(player_level, opponent_level, cfg);
    let boosted = scaled * (1.0 + f64::from(bonus_percent) / 100.0);
    boosted.round().max(0.0) as u32
}

/// XP needed to leave `level`.
#[must_use]
pub fn required_xp(level: u32, xp_per_level: u32) -> u32 {
    level.max(1).saturating_mul(xp_per_level.max(1))
}

/// Level and XP after a gain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u32,
    pub levels_gained: u32,
}

/// Add `gain` to `xp` and level up while the current level's requirement is
/// met, carrying the remainder.
#[must_use]
pub fn apply_xp(level: u32, xp: u32, gain: u32, xp_per_level: u32) -> LevelProgress {
    let mut level = level.max(1);
    let mut xp = xp.saturating_add(gain);
    let mut levels_gained = 0;
    loop {
        let needed = required_xp(level, xp_per_level);
        if xp < needed {
            break;
        }
        xp -= needed;
        level += 1;
        levels_gained += 1;
    }
    LevelProgress {
        level,
        xp,
        levels_gained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_clamped() {
        let cfg = ScoringConfig::default();
        assert_eq!(level_multiplier(5, 5, &cfg), 1.0);
        assert_eq!(level_multiplier(1, 30, &cfg), 1.5);
        assert_eq!(level_multiplier(30, 1, &cfg), 0.5);
        assert!((level_multiplier(5, 7, &cfg) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_xp_gain_ordering_and_bonus() {
        let cfg = ScoringConfig::default();
        let win = xp_gain(&cfg, GameMode::Standard, Outcome::Win, 3, 3, 0);
        let draw = xp_gain(&cfg, GameMode::Standard, Outcome::Draw, 3, 3, 0);
        let loss = xp_gain(&cfg, GameMode::Standard, Outcome::Loss, 3, 3, 0);
        assert_eq!((win, draw, loss), (100, 50, 30));

        assert_eq!(xp_gain(&cfg, GameMode::Standard, Outcome::Win, 3, 3, 50), 150);
        assert_eq!(xp_gain(&cfg, GameMode::Base, Outcome::Win, 3, 3, 0), 120);
    }

    #[test]
    fn test_multi_level_up() {
        // Level 1 needs 100, level 2 needs 200: 350 XP from zero reaches 3 with 50 left.
        let p = apply_xp(1, 0, 350, 100);
        assert_eq!(
            p,
            LevelProgress {
                level: 3,
                xp: 50,
                levels_gained: 2
            }
        );
        assert_eq!(apply_xp(2, 10, 20, 100).levels_gained, 0);
    }
}
