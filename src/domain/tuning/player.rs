/// Gameplay tuning for player characters.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Base movement speed in units per second.
    pub move_speed: f32,

    /// Speed multiplier while a speed-boost modifier is active.
    pub speed_boost_factor: f32,

    /// World-space collision radius (server-side hit checks).
    pub radius: f32,

    /// Starting and per-level maximum health.
    pub max_health: f32,
    pub max_health_per_level: f32,

    /// Passive regeneration, applied in fixed-size ticks.
    pub regen_per_tick: f32,
    pub regen_interval: Duration,

    /// Missed regeneration ticks applied at most per frame, bounding
    /// catch-up heals after a stall.
    pub regen_catchup_ticks: u32,

    /// Rolling window a consecutive-kill combo stays alive.
    pub combo_timeout: Duration,

    /// Minimum time between contact-damage applications from one source.
    pub contact_damage_interval: Duration,

    /// Minimum time between trail-damage applications from one trail.
    pub trail_damage_interval: Duration,

    /// Pickup collection radius.
    pub pickup_radius: f32,

    /// Experience required for level 2; each level needs this much more.
    pub xp_per_level: u64,

    /// Spawn protection granted on join.
    pub spawn_protection: Duration,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 220.0,
            speed_boost_factor: 1.5,
            radius: 16.0,
            max_health: 100.0,
            max_health_per_level: 10.0,
            regen_per_tick: 1.0,
            regen_interval: Duration::from_millis(1000),
            regen_catchup_ticks: 3,
            combo_timeout: Duration::from_secs(4),
            contact_damage_interval: Duration::from_millis(500),
            trail_damage_interval: Duration::from_millis(500),
            pickup_radius: 28.0,
            xp_per_level: 100,
            spawn_protection: Duration::from_secs(3),
        }
    }
}
