// Ports the domain needs the outer layers to satisfy.

use std::time::Instant;

use crate::domain::state::{Player, SessionStats};

/// Death-progression contract consumed by combat resolution. Injected into
/// the resolver at construction; implementations must never block the tick
/// and must never let a persistence failure propagate back into it.
pub trait DeathSink {
    fn record_death(&mut self, player: &Player, stats: SessionStats, now: Instant);
}
