//! Engine process configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How to start and drive the external engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable path.
    pub program: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Per-command response timeout in milliseconds.
    pub timeout_ms: u64,
    /// Strength used when a session does not name one.
    pub default_level: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "gnugo".to_string(),
            args: vec!["--mode".to_string(), "gtp".to_string()],
            timeout_ms: 15_000,
            default_level: 10,
        }
    }
}

impl EngineConfig {
    /// Config for a specific executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ..Self::default()
        }
    }

    /// Set the argument list.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-command timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the default level.
    #[must_use]
    pub fn with_default_level(mut self, level: u8) -> Self {
        self.default_level = level;
        self
    }

    /// Per-command timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_is_fifteen_seconds() {
        assert_eq!(EngineConfig::default().timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_builder() {
        let cfg = EngineConfig::new("katago")
            .with_args(["gtp", "-config", "k.cfg"])
            .with_timeout(Duration::from_millis(250))
            .with_default_level(3);
        assert_eq!(cfg.program, "katago");
        assert_eq!(cfg.args.len(), 3);
        assert_eq!(cfg.timeout_ms, 250);
        assert_eq!(cfg.default_level, 3);
    }
}
