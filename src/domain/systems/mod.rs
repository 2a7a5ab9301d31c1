// Per-tick simulation systems, in roughly the order the scheduler runs
// them. All take `&mut World` plus an explicit `now`; none own state.

pub mod adversaries;
pub mod cleanup;
pub mod combat;
pub mod hazards;
pub mod players;
pub mod projectiles;
pub mod spatial;
pub mod status_effects;
pub mod waves;
