//! Engine bridge error types.

use thiserror::Error;

/// Errors from engine process operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("failed to spawn engine '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Process exited or its pipes closed; needs explicit recreation.
    #[error("engine process is unavailable")]
    ProcessUnavailable,

    /// No response within the command timeout.
    #[error("engine command '{command}' timed out")]
    Timeout { command: String },

    /// Malformed or unattributable output.
    #[error("engine protocol error: {0}")]
    Protocol(String),

    /// Engine answered `?`.
    #[error("engine rejected '{command}': {message}")]
    Rejected { command: String, message: String },
}

impl EngineError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "ENGINE_SPAWN",
            Self::ProcessUnavailable => "ENGINE_UNAVAILABLE",
            Self::Timeout { .. } => "ENGINE_TIMEOUT",
            Self::Protocol(_) => "ENGINE_PROTOCOL",
            Self::Rejected { .. } => "ENGINE_REJECTED",
        }
    }

    /// Faults the bridge handles by resyncing the process.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Protocol(_) | Self::Rejected { .. }
        )
    }
}
