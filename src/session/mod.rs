//! Session phase machine.
//!
//! - [`placement`]: hidden base stones and their mutual elimination
//! - [`komi`]: the color/komi auction
//! - [`machine`]: action dispatch and the deadline sweep
//! - [`registry`]: live sessions behind per-session locks

pub mod komi;
pub mod machine;
pub mod placement;
pub mod registry;

pub use machine::{apply_action, objective_open, start, sweep};
pub use registry::{SessionHandle, SessionRegistry};
