//! Starting engine processes.
//!
//! The bridge never spawns anything itself; it asks an [`EngineLauncher`] for
//! a connected [`EngineConnection`]. Production uses [`ProcessLauncher`];
//! tests plug in an in-memory engine.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::info;

use super::config::EngineConfig;
use super::connection::EngineConnection;
use super::error::EngineError;

/// Creates engine connections.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start a fresh engine and connect to it.
    async fn launch(&self, config: &EngineConfig) -> Result<EngineConnection, EngineError>;
}

/// Spawns the configured executable with piped stdio.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl EngineLauncher for ProcessLauncher {
    async fn launch(&self, config: &EngineConfig) -> Result<EngineConnection, EngineError> {
        let spawn_failed = |source: std::io::Error| EngineError::Spawn {
            program: config.program.clone(),
            source,
        };

        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_failed)?;

        let missing = |what: &str| {
            spawn_failed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("engine {what} not captured"),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;

        info!(program = %config.program, pid = ?child.id(), "engine process started");
        Ok(EngineConnection::new(BufReader::new(stdout), stdin, config.timeout()).with_child(child))
    }
}
