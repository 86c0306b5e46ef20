//! External engine bridge.
//!
//! One engine process per AI-backed session, driven over a line-oriented
//! GTP-style text protocol.
//!
//! - [`coords`]: vertex encoding
//! - [`connection`]: FIFO single-in-flight command channel with timeouts
//! - [`launcher`]: process spawning seam
//! - [`bridge`]: setup, move mirroring, generation, scoring queries, resync

pub mod bridge;
pub mod config;
pub mod connection;
pub mod coords;
pub mod error;
pub mod launcher;

pub use bridge::{EngineBridge, EngineScore, EngineSetup, GoalContext};
pub use config::EngineConfig;
pub use connection::EngineConnection;
pub use coords::{parse_vertex, to_vertex, Vertex};
pub use error::EngineError;
pub use launcher::{EngineLauncher, ProcessLauncher};
