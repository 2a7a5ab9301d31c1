// Wave progression state machine. Farming waves run a timed spawner until
// the kill target is met; designated boss waves swap the spawner for a
// single boss whose death advances the wave.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::info;

use crate::domain::state::{AdversaryKind, CombatSignal, EntityId, Hazard, Notification, World};
use crate::domain::systems::adversaries::spawn_adversary;
use crate::domain::tuning::wave::WaveTuning;
use crate::domain::tuning::{boss, Tuning};

const BOSS_SPAWN_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePhase {
    Farming,
    BossPending { spawn_at: Instant },
    BossActive { boss_id: EntityId },
}

#[derive(Debug, Clone)]
pub struct WaveMachine {
    pub wave: u32,
    pub phase: WavePhase,
    pub kills_this_wave: u32,
    /// Kill target for the current farming wave; 0 until the first drive.
    pub target: u32,
    /// Difficulty dial from server configuration; scales targets and the
    /// spawn cadence together.
    pub spawn_rate_modifier: f32,
    next_spawn_at: Option<Instant>,
}

impl WaveMachine {
    pub fn new() -> Self {
        Self {
            wave: 1,
            phase: WavePhase::Farming,
            kills_this_wave: 0,
            target: 0,
            spawn_rate_modifier: 1.0,
            next_spawn_at: None,
        }
    }
}

impl Default for WaveMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain combat signals and run one step of the machine. Called once per
/// tick, after combat resolution.
pub fn drive(world: &mut World, tuning: &Tuning, now: Instant) {
    let wt = tuning.wave;
    let mut m = std::mem::take(&mut world.waves);

    if m.target == 0 {
        m.target = wt.target_count(m.wave, m.spawn_rate_modifier);
        world.notify(Notification::WaveStarted {
            wave: m.wave,
            target: m.target,
        });
        lay_wave_hazards(world, &wt, m.wave, now);
    }

    let mut boss_down = false;
    for signal in std::mem::take(&mut world.signals) {
        match signal {
            CombatSignal::AdversaryKilled { id, was_boss, .. } => {
                if was_boss && matches!(m.phase, WavePhase::BossActive { boss_id } if boss_id == id)
                {
                    boss_down = true;
                } else if !was_boss {
                    m.kills_this_wave += 1;
                }
            }
            CombatSignal::PlayerDied { .. } => {}
        }
    }

    if boss_down {
        info!(wave = m.wave, "boss defeated, advancing wave");
        world.notify(Notification::BossDefeated { wave: m.wave });
        reward_survivors(world, wt.boss_reward_heal, wt.boss_reward_gold);
        advance_wave(&mut m, world, &wt, now);
    }

    match m.phase {
        WavePhase::Farming => {
            if m.kills_this_wave >= m.target {
                info!(wave = m.wave, kills = m.kills_this_wave, "wave cleared");
                advance_wave(&mut m, world, &wt, now);
            } else {
                run_spawner(&mut m, world, tuning, now);
            }
        }
        WavePhase::BossPending { spawn_at } if now >= spawn_at => {
            let kind = wt.boss_for_wave(m.wave);
            let spec = boss::spec(kind);
            let (cx, _) = world.arena.center();
            let y = world.arena.min_y + spec.size * 2.0;
            let boss_id =
                spawn_adversary(world, AdversaryKind::Boss(kind), cx, y, m.wave, tuning, now);
            info!(wave = m.wave, boss = spec.name, "boss spawned");
            world.notify(Notification::BossSpawned {
                wave: m.wave,
                name: spec.name,
            });
            m.phase = WavePhase::BossActive { boss_id };
        }
        _ => {}
    }

    world.waves = m;
}

fn advance_wave(m: &mut WaveMachine, world: &mut World, wt: &WaveTuning, now: Instant) {
    m.wave += 1;
    m.kills_this_wave = 0;
    m.target = wt.target_count(m.wave, m.spawn_rate_modifier);
    m.next_spawn_at = None;
    m.phase = if wt.is_boss_wave(m.wave) {
        WavePhase::BossPending {
            spawn_at: now + BOSS_SPAWN_DELAY,
        }
    } else {
        WavePhase::Farming
    };
    world.notify(Notification::WaveStarted {
        wave: m.wave,
        target: m.target,
    });
    lay_wave_hazards(world, wt, m.wave, now);
}

/// Standing hazards scattered over the arena interior at wave start; later
/// waves get more of them.
fn lay_wave_hazards(world: &mut World, wt: &WaveTuning, wave: u32, now: Instant) {
    const INSET: f32 = 120.0;
    let a = world.arena.clone();
    for _ in 0..wt.hazard_count(wave) {
        let x = world.rng.gen_range(a.min_x + INSET..a.max_x - INSET);
        let y = world.rng.gen_range(a.min_y + INSET..a.max_y - INSET);
        let id = world.alloc_id();
        world.hazards.insert(
            id,
            Hazard {
                id,
                x,
                y,
                radius: wt.hazard_radius,
                damage: wt.hazard_damage,
                expires_at: now + wt.hazard_lifetime,
                last_damage_at: None,
            },
        );
    }
}

fn reward_survivors(world: &mut World, heal: f32, gold: u64) {
    for p in world.players.values_mut() {
        if p.alive {
            p.health = (p.health + heal).min(p.max_health);
            p.gold += gold;
            p.score += gold;
        }
    }
}

fn run_spawner(m: &mut WaveMachine, world: &mut World, tuning: &Tuning, now: Instant) {
    let wt = tuning.wave;
    if world.adversaries.len() >= wt.max_active {
        return;
    }
    match m.next_spawn_at {
        Some(at) if now < at => return,
        _ => {}
    }
    m.next_spawn_at = Some(now + wt.spawn_interval(m.wave, m.spawn_rate_modifier));

    let table = wt.spawn_table(m.wave);
    let kind = table[world.rng.gen_range(0..table.len())];
    let (x, y) = edge_spawn_point(world);
    spawn_adversary(world, kind, x, y, m.wave, tuning, now);
}

/// Random point just inside a random arena edge.
fn edge_spawn_point(world: &mut World) -> (f32, f32) {
    let a = world.arena.clone();
    const INSET: f32 = 24.0;
    match world.rng.gen_range(0..4u8) {
        0 => (world.rng.gen_range(a.min_x..a.max_x), a.min_y + INSET),
        1 => (world.rng.gen_range(a.min_x..a.max_x), a.max_y - INSET),
        2 => (a.min_x + INSET, world.rng.gen_range(a.min_y..a.max_y)),
        _ => (a.max_x - INSET, world.rng.gen_range(a.min_y..a.max_y)),
    }
}
