// Use cases layer: tick orchestration, persistence workflows and the
// world task.

pub mod game;
pub mod persistence;
pub mod scheduler;
pub mod types;

pub use types::{GameEvent, ServerState, WorldUpdate};
