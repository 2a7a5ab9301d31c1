/// Gameplay tuning for projectiles.
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Default projectile speed in units per second.
    pub speed: f32,

    /// Lifetime before an unspent projectile is despawned.
    pub lifetime: Duration,

    /// World-space collision radius.
    pub radius: f32,

    /// Sub-step length as a fraction of the smallest target radius; per-tick
    /// displacement beyond this is integrated in multiple steps so fast
    /// projectiles cannot tunnel through targets.
    pub substep_fraction: f32,

    /// Hard cap on sub-steps per projectile per tick.
    pub max_substeps: u32,

    /// Chain-lightning search radius and per-jump damage falloff.
    pub chain_radius: f32,
    pub chain_falloff: f32,

    /// Poison applied by poison-flagged projectiles.
    pub poison_damage_per_tick: f32,
    pub poison_duration: Duration,
    pub poison_tick_interval: Duration,

    /// Slow applied by ice-flagged projectiles.
    pub ice_slow_factor: f32,
    pub ice_slow_duration: Duration,

    /// Chance an ice-flagged hit freezes the target solid instead of only
    /// slowing it.
    pub ice_freeze_chance: f32,
    pub ice_freeze_duration: Duration,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 520.0,
            lifetime: Duration::from_millis(1500),
            radius: 5.0,
            substep_fraction: 0.5,
            max_substeps: 8,
            chain_radius: 140.0,
            chain_falloff: 0.7,
            poison_damage_per_tick: 3.0,
            poison_duration: Duration::from_secs(3),
            poison_tick_interval: Duration::from_millis(500),
            ice_slow_factor: 0.5,
            ice_slow_duration: Duration::from_millis(2000),
            ice_freeze_chance: 0.15,
            ice_freeze_duration: Duration::from_millis(900),
        }
    }
}
