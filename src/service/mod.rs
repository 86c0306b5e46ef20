//! Async match service: registry, engines and scoring behind per-session
//! locks.

pub mod config;
pub mod match_service;

pub use config::{ArenaConfig, NewSession};
pub use match_service::MatchService;
