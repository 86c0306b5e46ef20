//! Logistic (Elo) rating model.

use serde::{Deserialize, Serialize};

/// A player's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Actual score for the rating model.
    #[must_use]
    pub fn actual(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }
}

/// Expected score of `player` against `opponent`.
#[must_use]
pub fn expected_score(player: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - player) / 400.0))
}

/// Rating change for one game.
#[must_use]
pub fn rating_delta(player: i32, opponent: i32, outcome: Outcome, k: f64) -> i32 {
    (k * (outcome.actual() - expected_score(player, opponent))).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_ratings() {
        assert!((expected_score(1500, 1500) - 0.5).abs() < 1e-12);
        assert_eq!(rating_delta(1500, 1500, Outcome::Win, 32.0), 16);
        assert_eq!(rating_delta(1500, 1500, Outcome::Loss, 32.0), -16);
        assert_eq!(rating_delta(1500, 1500, Outcome::Draw, 32.0), 0);
    }

    #[test]
    fn test_upset_pays_more() {
        let upset = rating_delta(1400, 1800, Outcome::Win, 32.0);
        let expected = rating_delta(1800, 1400, Outcome::Win, 32.0);
        assert!(upset > expected);
        assert_eq!(upset, 29);
        assert_eq!(expected, 3);
    }

    proptest! {
        #[test]
        fn prop_delta_bounded_by_k(a in 0i32..3000, b in 0i32..3000) {
            for outcome in [Outcome::Win, Outcome::Draw, Outcome::Loss] {
                let d = rating_delta(a, b, outcome, 32.0);
                prop_assert!(d.abs() <= 32);
            }
        }
    }
}
