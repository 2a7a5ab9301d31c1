/// Wave progression tuning.
use std::time::Duration;

use crate::domain::state::{AdversaryKind, BossKind};

#[derive(Debug, Clone, Copy)]
pub struct WaveTuning {
    /// Kills required to finish wave 1.
    pub base_target: u32,
    /// Extra kills required per wave after the first.
    pub target_per_wave: u32,
    /// Every Nth wave is a boss wave.
    pub boss_wave_every: u32,
    /// Base delay between adversary spawns on wave 1.
    pub base_spawn_interval: Duration,
    /// Spawn interval shrinks by this fraction per wave, floored below.
    pub spawn_interval_decay: f32,
    pub min_spawn_interval: Duration,
    /// Upper bound on concurrently live adversaries.
    pub max_active: usize,
    /// Reward granted to living players when a boss falls.
    pub boss_reward_heal: f32,
    pub boss_reward_gold: u64,

    /// Standing arena hazards laid down at wave start, from this wave on.
    pub hazard_first_wave: u32,
    pub hazard_max: usize,
    pub hazard_radius: f32,
    pub hazard_damage: f32,
    pub hazard_lifetime: Duration,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_target: 10,
            target_per_wave: 5,
            boss_wave_every: 5,
            base_spawn_interval: Duration::from_millis(1400),
            spawn_interval_decay: 0.05,
            min_spawn_interval: Duration::from_millis(350),
            max_active: 120,
            boss_reward_heal: 25.0,
            boss_reward_gold: 100,
            hazard_first_wave: 3,
            hazard_max: 4,
            hazard_radius: 60.0,
            hazard_damage: 5.0,
            hazard_lifetime: Duration::from_secs(45),
        }
    }
}

impl WaveTuning {
    pub fn is_boss_wave(&self, wave: u32) -> bool {
        wave > 0 && wave % self.boss_wave_every == 0
    }

    /// Hazards laid down when `wave` starts; one more every few waves.
    pub fn hazard_count(&self, wave: u32) -> usize {
        if wave < self.hazard_first_wave {
            return 0;
        }
        (1 + (wave - self.hazard_first_wave) as usize / 3).min(self.hazard_max)
    }

    /// Target adversary count for a wave, scaled by the active spawn-rate
    /// modifier. Broadcast to clients on each wave start.
    pub fn target_count(&self, wave: u32, spawn_rate_modifier: f32) -> u32 {
        let base = self.base_target + self.target_per_wave * wave.saturating_sub(1);
        ((base as f32) * spawn_rate_modifier).round().max(1.0) as u32
    }

    pub fn spawn_interval(&self, wave: u32, spawn_rate_modifier: f32) -> Duration {
        let decay = 1.0 - (self.spawn_interval_decay * wave.saturating_sub(1) as f32).min(0.8);
        let secs = self.base_spawn_interval.as_secs_f32() * decay / spawn_rate_modifier.max(0.1);
        Duration::from_secs_f32(secs).max(self.min_spawn_interval)
    }

    /// Boss kind for a boss wave; rotates through the roster.
    pub fn boss_for_wave(&self, wave: u32) -> BossKind {
        match (wave / self.boss_wave_every) % 3 {
            0 => BossKind::Behemoth,
            1 => BossKind::Abomination,
            _ => BossKind::Lich,
        }
    }

    /// Spawn table for a farming wave; later waves mix in specialists.
    pub fn spawn_table(&self, wave: u32) -> &'static [AdversaryKind] {
        use AdversaryKind::*;
        match wave {
            0..=1 => &[Walker, Walker, Walker, Runner],
            2..=3 => &[Walker, Walker, Runner, Spitter, Bomber],
            4..=6 => &[Walker, Runner, Spitter, Brute, Shieldbearer, Bomber, Splitter],
            7..=9 => &[
                Walker,
                Runner,
                Spitter,
                Brute,
                Shieldbearer,
                Splitter,
                Teleporter,
                Summoner,
                Berserker,
            ],
            _ => &[
                Runner,
                Spitter,
                Brute,
                Shieldbearer,
                Bomber,
                Splitter,
                Teleporter,
                Summoner,
                Berserker,
                Necromancer,
                Slammer,
                Shapeshifter,
            ],
        }
    }
}
