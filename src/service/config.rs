//! Service-level configuration.

use serde::{Deserialize, Serialize};

use crate::core::{PlayerMap, PlayerSlot, SessionConfig, SessionId};
use crate::engine::EngineConfig;
use crate::scoring::ScoringConfig;

/// Everything shared by all sessions of one service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub scoring: ScoringConfig,
    pub engine: EngineConfig,
}

impl ArenaConfig {
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Request to form a match.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSession {
    /// Fixed id; generated when absent.
    pub id: Option<SessionId>,
    pub config: SessionConfig,
    pub players: PlayerMap<PlayerSlot>,
    /// RNG seed; derived from the id when absent.
    pub seed: Option<u64>,
}

impl NewSession {
    pub fn new(config: SessionConfig, players: PlayerMap<PlayerSlot>) -> Self {
        Self {
            id: None,
            config,
            players,
            seed: None,
        }
    }

    /// Two humans.
    pub fn humans(config: SessionConfig, first: &str, second: &str) -> Self {
        Self::new(config, PlayerMap::from_pair(PlayerSlot::human(first), PlayerSlot::human(second)))
    }

    /// A human in seat 0 against the engine in seat 1.
    pub fn against_ai(config: SessionConfig, human: &str, level: u8) -> Self {
        Self::new(config, PlayerMap::from_pair(PlayerSlot::human(human), PlayerSlot::ai(level)))
    }

    #[must_use]
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
