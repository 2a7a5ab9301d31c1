/// Gameplay tuning for computer-controlled adversaries.
use std::time::Duration;

use crate::domain::state::AdversaryKind;

/// Stats a freshly spawned adversary starts with, scaled by wave number.
#[derive(Debug, Clone, Copy)]
pub struct KindStats {
    pub health: f32,
    pub speed: f32,
    pub size: f32,
    pub contact_damage: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AdversaryTuning {
    /// Hard cap on displacement per second, regardless of effects and rage.
    pub max_speed: f32,

    /// Health and damage growth per wave, as fractions of the base stats.
    pub health_growth_per_wave: f32,
    pub damage_growth_per_wave: f32,

    /// Pairwise separation between nearby adversaries.
    pub separation_radius: f32,
    pub separation_push: f32,

    /// Soft wall repulsion strength; the center-ward unstick push kicks in
    /// once penetration exceeds half the adversary radius.
    pub wall_repulsion: f32,
    pub unstick_push: f32,

    // Ability cooldowns.
    pub spit_cooldown: Duration,
    pub blink_cooldown: Duration,
    pub summon_cooldown: Duration,
    pub dash_cooldown: Duration,
    pub dash_duration: Duration,
    pub dash_speed_factor: f32,
    pub revive_cooldown: Duration,
    pub revive_radius: f32,
    pub slam_cooldown: Duration,
    pub slam_radius: f32,
    pub slam_damage: f32,
    pub clone_cooldown: Duration,
    pub clone_lifetime: Duration,

    /// Poison-trail segments shed by trailing kinds while they move.
    pub trail_drop_interval: Duration,
    pub trail_radius: f32,
    pub trail_damage: f32,
    pub trail_lifetime: Duration,

    /// Shieldbearer frontal arc (radians, half-angle) and mitigation.
    pub shield_arc: f32,
    pub shield_mitigation: f32,

    /// Splitter offspring count and stat fraction.
    pub split_count: u32,
    pub split_stat_fraction: f32,
    pub split_blast_radius: f32,
    pub split_blast_damage: f32,

    /// Bomber death blast.
    pub bomber_blast_radius: f32,
    pub bomber_blast_damage: f32,

    /// How long a corpse stays available for necromancy.
    pub corpse_lifetime: Duration,
}

impl Default for AdversaryTuning {
    fn default() -> Self {
        Self {
            max_speed: 400.0,
            health_growth_per_wave: 0.12,
            damage_growth_per_wave: 0.06,
            separation_radius: 28.0,
            separation_push: 60.0,
            wall_repulsion: 0.6,
            unstick_push: 24.0,
            spit_cooldown: Duration::from_millis(2200),
            blink_cooldown: Duration::from_millis(3500),
            summon_cooldown: Duration::from_millis(5000),
            dash_cooldown: Duration::from_millis(3000),
            dash_duration: Duration::from_millis(400),
            dash_speed_factor: 2.6,
            revive_cooldown: Duration::from_millis(6000),
            revive_radius: 220.0,
            slam_cooldown: Duration::from_millis(4000),
            slam_radius: 120.0,
            slam_damage: 18.0,
            clone_cooldown: Duration::from_millis(7000),
            clone_lifetime: Duration::from_millis(6000),
            trail_drop_interval: Duration::from_millis(350),
            trail_radius: 12.0,
            trail_damage: 2.5,
            trail_lifetime: Duration::from_secs(4),
            shield_arc: std::f32::consts::FRAC_PI_3,
            shield_mitigation: 0.7,
            split_count: 2,
            split_stat_fraction: 0.45,
            split_blast_radius: 70.0,
            split_blast_damage: 8.0,
            bomber_blast_radius: 110.0,
            bomber_blast_damage: 26.0,
            corpse_lifetime: Duration::from_secs(10),
        }
    }
}

impl AdversaryTuning {
    /// Base stats for a kind before wave scaling. Bosses are stat-tabled in
    /// `tuning::boss` instead.
    pub fn base_stats(&self, kind: AdversaryKind) -> KindStats {
        match kind {
            AdversaryKind::Walker => KindStats { health: 30.0, speed: 70.0, size: 14.0, contact_damage: 8.0 },
            AdversaryKind::Runner => KindStats { health: 18.0, speed: 140.0, size: 11.0, contact_damage: 6.0 },
            AdversaryKind::Brute => KindStats { health: 90.0, speed: 45.0, size: 22.0, contact_damage: 16.0 },
            AdversaryKind::Spitter => KindStats { health: 26.0, speed: 60.0, size: 13.0, contact_damage: 5.0 },
            AdversaryKind::Shieldbearer => KindStats { health: 55.0, speed: 55.0, size: 16.0, contact_damage: 10.0 },
            AdversaryKind::Bomber => KindStats { health: 22.0, speed: 95.0, size: 13.0, contact_damage: 4.0 },
            AdversaryKind::Splitter => KindStats { health: 48.0, speed: 65.0, size: 18.0, contact_damage: 9.0 },
            AdversaryKind::Splinterling => KindStats { health: 20.0, speed: 85.0, size: 10.0, contact_damage: 5.0 },
            AdversaryKind::Teleporter => KindStats { health: 28.0, speed: 75.0, size: 13.0, contact_damage: 8.0 },
            AdversaryKind::Summoner => KindStats { health: 40.0, speed: 40.0, size: 15.0, contact_damage: 5.0 },
            AdversaryKind::Berserker => KindStats { health: 60.0, speed: 80.0, size: 17.0, contact_damage: 12.0 },
            AdversaryKind::Necromancer => KindStats { health: 45.0, speed: 45.0, size: 15.0, contact_damage: 6.0 },
            AdversaryKind::Slammer => KindStats { health: 80.0, speed: 50.0, size: 20.0, contact_damage: 12.0 },
            AdversaryKind::Shapeshifter => KindStats { health: 38.0, speed: 70.0, size: 14.0, contact_damage: 8.0 },
            AdversaryKind::Boss(_) => KindStats { health: 1000.0, speed: 55.0, size: 36.0, contact_damage: 20.0 },
        }
    }

    /// Stats scaled for the wave the adversary spawns in.
    pub fn stats_for_wave(&self, kind: AdversaryKind, wave: u32) -> KindStats {
        let base = self.base_stats(kind);
        let waves = wave.saturating_sub(1) as f32;
        KindStats {
            health: base.health * (1.0 + self.health_growth_per_wave * waves),
            speed: base.speed,
            size: base.size,
            contact_damage: base.contact_damage * (1.0 + self.damage_growth_per_wave * waves),
        }
    }
}
