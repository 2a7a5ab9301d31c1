// Domain layer: the world aggregate, simulation systems, tuning data and
// the ports the outer layers satisfy.

pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;
