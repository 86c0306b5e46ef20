//! Seat identification and per-seat data storage.
//!
//! ## PlayerId
//!
//! A Go match always has exactly two seats. `PlayerId(0)` is the seat of the
//! player who created or was listed first in the match, `PlayerId(1)` the
//! other one. Seats are not colors: in base mode colors are only known after
//! the komi auction.
//!
//! ## PlayerMap
//!
//! Fixed two-slot storage indexed by `PlayerId`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Number of seats in a match.
pub const SEAT_COUNT: usize = 2;

/// Seat identifier (0 or 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// First seat.
    pub const FIRST: PlayerId = PlayerId(0);
    /// Second seat.
    pub const SECOND: PlayerId = PlayerId(1);

    /// Create a new seat id.
    ///
    /// Panics on anything other than 0 or 1.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        assert!(id < SEAT_COUNT as u8, "seat must be 0 or 1");
        Self(id)
    }

    /// Raw seat index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other seat.
    #[must_use]
    pub const fn opponent(self) -> Self {
        Self(1 - self.0)
    }

    /// Both seats, in order.
    pub fn both() -> impl Iterator<Item = PlayerId> {
        [Self::FIRST, Self::SECOND].into_iter()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seat {}", self.0)
    }
}

/// Per-seat data with O(1) access.
///
/// ```
/// use rust_baduk::core::{PlayerId, PlayerMap};
///
/// let mut captures: PlayerMap<u32> = PlayerMap::with_value(0);
/// captures[PlayerId::SECOND] += 3;
/// assert_eq!(captures[PlayerId::FIRST], 0);
/// assert_eq!(captures[PlayerId::SECOND], 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: [T; SEAT_COUNT],
}

impl<T> PlayerMap<T> {
    /// Build from a factory receiving each seat.
    pub fn new(factory: impl Fn(PlayerId) -> T) -> Self {
        Self {
            data: [factory(PlayerId::FIRST), factory(PlayerId::SECOND)],
        }
    }

    /// Build from explicit values for seat 0 and seat 1.
    pub fn from_pair(first: T, second: T) -> Self {
        Self {
            data: [first, second],
        }
    }

    /// All seats set to the same value.
    pub fn with_value(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(|_| value.clone())
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        PlayerId::both().zip(self.data.iter())
    }

    /// Iterate over (PlayerId, &mut T) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        PlayerId::both().zip(self.data.iter_mut())
    }

    /// Seat whose value satisfies the predicate, first seat first.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<PlayerId> {
        self.iter().find(|(_, v)| predicate(v)).map(|(p, _)| p)
    }

    /// Map every slot into a new `PlayerMap`.
    pub fn map<U>(&self, f: impl Fn(PlayerId, &T) -> U) -> PlayerMap<U> {
        PlayerMap::new(|p| f(p, &self.data[p.index()]))
    }

    /// True when the predicate holds for both seats.
    pub fn all(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.data.iter().all(predicate)
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        &self.data[player.index()]
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        &mut self.data[player.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent() {
        assert_eq!(PlayerId::FIRST.opponent(), PlayerId::SECOND);
        assert_eq!(PlayerId::SECOND.opponent(), PlayerId::FIRST);
        assert_eq!(format!("{}", PlayerId::SECOND), "Seat 1");
    }

    #[test]
    #[should_panic(expected = "seat must be 0 or 1")]
    fn test_third_seat_rejected() {
        let _ = PlayerId::new(2);
    }

    #[test]
    fn test_player_map_factory_and_mutation() {
        let mut map: PlayerMap<i32> = PlayerMap::new(|p| p.index() as i32 * 10);
        assert_eq!(map[PlayerId::FIRST], 0);
        assert_eq!(map[PlayerId::SECOND], 10);

        map[PlayerId::FIRST] = 7;
        assert_eq!(map[PlayerId::FIRST], 7);
    }

    #[test]
    fn test_player_map_find_and_all() {
        let map = PlayerMap::from_pair(false, true);
        assert_eq!(map.find(|v| *v), Some(PlayerId::SECOND));
        assert!(!map.all(|v| *v));

        let doubled = map.map(|p, v| (p.index(), *v));
        assert_eq!(doubled[PlayerId::SECOND], (1, true));
    }

    #[test]
    fn test_player_map_serialization() {
        let map: PlayerMap<i32> = PlayerMap::from_pair(1, 2);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: PlayerMap<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }
}
