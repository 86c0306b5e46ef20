//! Deterministic random number generation for session-level chance.
//!
//! Every random decision the core makes goes through [`RandomSource`]:
//! auto-filling base stones, the second-round komi coin flip, the engine
//! pass override and loot rolls.
//! Sessions carry a seeded [`GameRng`] state so a recorded match can be
//! replayed exactly; tests can substitute a scripted source.
//!
//! ```
//! use rust_baduk::core::{GameRng, RandomSource};
//!
//! let mut a = GameRng::new(7);
//! let mut b = GameRng::new(7);
//! assert_eq!(a.next_index(361), b.next_index(361));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Injectable randomness used by the phase machine and reward rolls.
pub trait RandomSource {
    /// Uniform index in `0..upper`. `upper` must be non-zero.
    fn next_index(&mut self, upper: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Fair coin.
    fn coin_flip(&mut self) -> bool {
        self.next_index(2) == 0
    }

    /// True with the given probability (clamped to `[0, 1]`).
    fn chance(&mut self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        self.next_unit() < p
    }

    /// Index picked with weighted probability. Weights need not sum to 1.
    ///
    /// Returns `None` if weights are empty or all zero.
    fn choose_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }

        let mut threshold = self.next_unit() * total;
        for (i, &weight) in weights.iter().enumerate() {
            if weight <= 0.0 {
                continue;
            }
            threshold -= weight;
            if threshold < 0.0 {
                return Some(i);
            }
        }

        // Rounding left a sliver; the last positive weight owns it.
        weights.iter().rposition(|w| *w > 0.0)
    }
}

/// Seeded ChaCha8 generator with O(1) serializable state.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent stream for a named purpose, derived from this seed.
    ///
    /// Reward rolls at session end use the `"loot"` stream, so they never
    /// move the session's own position.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        let mixed = context.bytes().fold(self.seed ^ 0x9E37_79B9_7F4A_7C15, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        Self::new(mixed)
    }

    /// Capture the current position for storage on the session record.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Restore a generator from a stored position.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

impl RandomSource for GameRng {
    fn next_index(&mut self, upper: usize) -> usize {
        self.inner.gen_range(0..upper)
    }

    fn next_unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Serializable RNG position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Original seed.
    pub seed: u64,
    /// ChaCha8 word position.
    pub word_pos: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_index(1000), rng2.next_index(1000));
        }
    }

    #[test]
    fn test_context_streams_differ() {
        let rng = GameRng::new(42);
        let mut loot = rng.for_context("loot");
        let mut placement = rng.for_context("placement");

        let a: Vec<_> = (0..10).map(|_| loot.next_index(1000)).collect();
        let b: Vec<_> = (0..10).map(|_| placement.next_index(1000)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_round_trip_continues_sequence() {
        let mut rng = GameRng::new(9);
        for _ in 0..50 {
            rng.next_index(19);
        }

        let state = rng.state();
        let expected: Vec<_> = (0..10).map(|_| rng.next_index(361)).collect();

        let mut restored = GameRng::from_state(&state);
        let actual: Vec<_> = (0..10).map(|_| restored.next_index(361)).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_choose_weighted() {
        let mut rng = GameRng::new(42);

        for _ in 0..10 {
            assert_eq!(rng.choose_weighted(&[0.0, 5.0, 0.0]), Some(1));
        }
        assert_eq!(rng.choose_weighted(&[]), None);
        assert_eq!(rng.choose_weighted(&[0.0, 0.0]), None);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = GameRng::new(3);
        assert!((0..20).all(|_| rng.chance(1.0)));
        assert!((0..20).all(|_| !rng.chance(0.0)));
        assert!((0..20).all(|_| rng.chance(7.5)));
    }

    #[test]
    fn test_context_stream_leaves_parent_untouched() {
        let rng = GameRng::new(5);
        let before = rng.state();
        let mut loot = rng.for_context("loot");
        for _ in 0..10 {
            loot.next_unit();
        }
        assert_eq!(rng.state(), before);
        assert_eq!(rng.for_context("loot").state().seed, loot.state().seed);
    }
}
