// Domain-level simulation entities, the world aggregate, and snapshot types.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::domain::systems::waves::WaveMachine;

pub type EntityId = u64;

/// Who fired a projectile. Adversary projectiles only ever hit players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Player(EntityId),
    Adversary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_y: f32,
    pub aim: f32,
    pub firing: bool,
}

/// Area-damage payload carried by explosive projectiles.
#[derive(Debug, Clone, Copy)]
pub struct ExplosiveSpec {
    /// Blast radius around the impact point.
    pub radius: f32,
    /// Fraction of the projectile's base damage applied in the blast.
    pub percent: f32,
}

#[derive(Debug, Clone)]
pub struct Weapon {
    pub damage: f32,
    pub cooldown: Duration,
    pub last_fired_at: Option<Instant>,
    /// Fires whenever the cooldown elapses, without the player holding fire.
    pub auto_fire: bool,
    pub projectile_speed: f32,
    pub piercing: u8,
    pub explosive: Option<ExplosiveSpec>,
    pub chain_jumps: u8,
    pub poison: bool,
    pub ice: bool,
}

pub struct Player {
    pub id: EntityId,
    /// Persistence identity; sessions without one are never persisted.
    pub account_id: Option<String>,
    pub display_name: String,
    pub x: f32,
    pub y: f32,
    pub aim: f32,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,

    pub combo: u32,
    pub combo_expires_at: Option<Instant>,
    pub highest_combo: u32,
    pub level: u32,
    pub experience: u64,
    pub score: u64,
    pub gold: u64,
    pub kills: u64,
    pub boss_kills: u64,
    pub joined_at: Instant,

    // Timed modifiers, all absolute expiry timestamps.
    pub speed_boost_until: Option<Instant>,
    pub weapon_boost_until: Option<Instant>,
    pub spawn_protection_until: Option<Instant>,
    pub invisible_until: Option<Instant>,

    pub last_regen_at: Instant,
    pub weapons: Vec<Weapon>,
    pub thorns: f32,
    pub lifesteal: f32,

    // Per-source damage attribution, capping how often one source can
    // reapply damage to this player.
    pub contact_damage_at: HashMap<EntityId, Instant>,
    pub trail_damage_at: HashMap<EntityId, Instant>,

    pub last_input: PlayerInput,
}

impl Player {
    pub fn is_protected(&self, now: Instant) -> bool {
        self.spawn_protection_until.is_some_and(|t| now < t)
    }

    pub fn is_invisible(&self, now: Instant) -> bool {
        self.invisible_until.is_some_and(|t| now < t)
    }

    pub fn has_speed_boost(&self, now: Instant) -> bool {
        self.speed_boost_until.is_some_and(|t| now < t)
    }

    pub fn has_weapon_boost(&self, now: Instant) -> bool {
        self.weapon_boost_until.is_some_and(|t| now < t)
    }

    pub fn survival_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.joined_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BossKind {
    Abomination,
    Lich,
    Behemoth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdversaryKind {
    Walker,
    Runner,
    Brute,
    Spitter,
    Shieldbearer,
    Bomber,
    Splitter,
    /// Reduced-stat offspring of a destroyed splitter.
    Splinterling,
    Teleporter,
    Summoner,
    Berserker,
    Necromancer,
    Slammer,
    Shapeshifter,
    Boss(BossKind),
}

impl AdversaryKind {
    pub fn is_boss(&self) -> bool {
        matches!(self, AdversaryKind::Boss(_))
    }

    /// Kinds that track players through invisibility and spawn protection.
    pub fn ignores_stealth(&self) -> bool {
        matches!(self, AdversaryKind::Boss(_) | AdversaryKind::Necromancer)
    }
}

/// Per-kind ability bookkeeping. One variant per handler so a kind's valid
/// field set is statically known.
#[derive(Debug, Clone, Copy)]
pub enum AbilityState {
    None,
    Spitter {
        next_spit_at: Instant,
    },
    Teleporter {
        next_blink_at: Instant,
    },
    Summoner {
        next_summon_at: Instant,
    },
    Berserker {
        enraged: bool,
        next_dash_at: Instant,
        dash_until: Option<Instant>,
        dash_x: f32,
        dash_y: f32,
    },
    Necromancer {
        next_revive_at: Instant,
    },
    Slammer {
        next_slam_at: Instant,
    },
    Shapeshifter {
        next_clone_at: Instant,
    },
    /// Kinds that shed poison trails while moving.
    Trailing {
        next_drop_at: Instant,
    },
    Boss(BossAbilityState),
}

/// Cooldowns and shield state for a boss. The phase itself lives on the
/// adversary record and only ever increases.
#[derive(Debug, Clone, Copy)]
pub struct BossAbilityState {
    pub shield_until: Option<Instant>,
    pub next_slam_at: Instant,
    pub next_summon_at: Instant,
    pub next_ultimate_at: Instant,
    pub enraged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FreezeEffect {
    pub until: Instant,
    pub original_speed: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SlowEffect {
    pub until: Instant,
    pub factor: f32,
    pub original_speed: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PoisonEffect {
    pub until: Instant,
    pub damage_per_tick: f32,
    pub tick_interval: Duration,
    pub next_tick_at: Instant,
    /// Player credited with poison kills, if any.
    pub source: Option<EntityId>,
}

/// Transient status-effect state for one adversary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectState {
    pub frozen: Option<FreezeEffect>,
    pub slowed: Option<SlowEffect>,
    pub poisoned: Option<PoisonEffect>,
}

pub struct Adversary {
    pub id: EntityId,
    pub kind: AdversaryKind,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    /// Current speed after status effects; `base_speed` is what effects restore.
    pub speed: f32,
    pub base_speed: f32,
    pub size: f32,
    pub facing: f32,
    pub contact_damage: f32,
    /// Monotonically non-decreasing; only meaningful for bosses.
    pub boss_phase: u8,
    pub ability: AbilityState,
    pub effects: EffectState,
    /// Clones and other short-lived spawns despawn without loot.
    pub despawn_at: Option<Instant>,
}

pub struct Projectile {
    pub id: EntityId,
    pub owner: Owner,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub damage: f32,
    pub piercing: u8,
    /// Target ids already hit; a projectile never hits the same id twice.
    pub pierced: Vec<EntityId>,
    pub explosive: Option<ExplosiveSpec>,
    pub chain_jumps: u8,
    pub chained: Vec<EntityId>,
    pub poison: bool,
    pub ice: bool,
    pub ignore_walls: bool,
    pub expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ProjectileSpec {
    pub owner: Owner,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
    pub radius: f32,
    pub damage: f32,
    pub piercing: u8,
    pub explosive: Option<ExplosiveSpec>,
    pub chain_jumps: u8,
    pub poison: bool,
    pub ice: bool,
    pub ignore_walls: bool,
    pub lifetime: Duration,
}

pub struct Hazard {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub damage: f32,
    pub expires_at: Instant,
    pub last_damage_at: Option<Instant>,
}

pub struct ToxicPool {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub damage: f32,
    pub expires_at: Instant,
    pub last_damage_at: Option<Instant>,
}

pub struct PoisonTrail {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub damage: f32,
    pub expires_at: Instant,
}

pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: u32,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub enum PickupKind {
    Gold(u64),
    Experience(u64),
    Heal(f32),
    SpeedBoost(Duration),
    WeaponBoost(Duration),
    Invisibility(Duration),
}

pub struct Pickup {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub kind: PickupKind,
    pub expires_at: Instant,
}

/// Position a necromancer can raise a fresh adversary from.
pub struct Corpse {
    pub x: f32,
    pub y: f32,
    pub kind: AdversaryKind,
    pub expires_at: Instant,
}

/// Axis-aligned obstacle inside the arena.
#[derive(Debug, Clone, Copy)]
pub struct WallRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Clone)]
pub struct Arena {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub walls: Vec<WallRect>,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            min_x: -960.0,
            max_x: 960.0,
            min_y: -540.0,
            max_y: 540.0,
            walls: Vec::new(),
        }
    }
}

impl Arena {
    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }
}

/// Elapsed-time state for the current tick, clamped by the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaTime {
    pub seconds: f32,
    pub multiplier: f32,
}

/// In-tick signals from combat resolution to the wave machine. Drained once
/// per tick by the wave phase.
#[derive(Debug, Clone, Copy)]
pub enum CombatSignal {
    AdversaryKilled {
        id: EntityId,
        by: Option<EntityId>,
        was_boss: bool,
    },
    PlayerDied {
        id: EntityId,
    },
}

/// Advisory client notifications. Best-effort only; publishing them never
/// affects simulation state.
#[derive(Debug, Clone)]
pub enum Notification {
    ComboUpdate { player_id: EntityId, combo: u32 },
    ComboReset { player_id: EntityId, best: u32 },
    LevelUp { player_id: EntityId, level: u32 },
    WaveStarted { wave: u32, target: u32 },
    BossSpawned { wave: u32, name: &'static str },
    BossDefeated { wave: u32 },
}

/// Session statistics captured at the moment of death. Field set and
/// semantics feed downstream progression scoring; do not reshape casually.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub wave: u32,
    pub level: u32,
    pub kills: u64,
    pub survival_time_seconds: u64,
    pub combo_max: u32,
    pub boss_kills: u64,
}

/// Entity counts snapshotted at the top of each tick for metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Population {
    pub players: usize,
    pub adversaries: usize,
    pub projectiles: usize,
    pub hazards: usize,
    pub particles: usize,
    pub pickups: usize,
}

/// The single shared mutable world aggregate. Owned exclusively by the
/// scheduler for the duration of one tick.
pub struct World {
    pub arena: Arena,
    pub players: HashMap<EntityId, Player>,
    pub adversaries: HashMap<EntityId, Adversary>,
    pub projectiles: HashMap<EntityId, Projectile>,
    pub hazards: HashMap<EntityId, Hazard>,
    pub toxic_pools: HashMap<EntityId, ToxicPool>,
    pub poison_trails: HashMap<EntityId, PoisonTrail>,
    pub pickups: HashMap<EntityId, Pickup>,
    pub particles: Vec<Particle>,
    pub corpses: Vec<Corpse>,

    pub waves: WaveMachine,
    pub signals: Vec<CombatSignal>,
    pub outbox: Vec<Notification>,
    pub delta: DeltaTime,
    pub tick: u64,

    pub rng: SmallRng,
    // Single monotonic counter: ids are unique for the process lifetime and
    // never reused while attribution maps may still reference them.
    next_entity_id: EntityId,
}

impl World {
    pub fn new(arena: Arena, seed: u64) -> Self {
        Self {
            arena,
            players: HashMap::new(),
            adversaries: HashMap::new(),
            projectiles: HashMap::new(),
            hazards: HashMap::new(),
            toxic_pools: HashMap::new(),
            poison_trails: HashMap::new(),
            pickups: HashMap::new(),
            particles: Vec::new(),
            corpses: Vec::new(),
            waves: WaveMachine::new(),
            signals: Vec::new(),
            outbox: Vec::new(),
            delta: DeltaTime::default(),
            tick: 0,
            rng: SmallRng::seed_from_u64(seed),
            next_entity_id: 1,
        }
    }

    pub fn alloc_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    pub fn population(&self) -> Population {
        Population {
            players: self.players.len(),
            adversaries: self.adversaries.len(),
            projectiles: self.projectiles.len(),
            hazards: self.hazards.len() + self.toxic_pools.len() + self.poison_trails.len(),
            particles: self.particles.len(),
            pickups: self.pickups.len(),
        }
    }

    // Entity factory surface. Allocation strategy is opaque to the systems.

    pub fn spawn_projectile(&mut self, spec: ProjectileSpec, now: Instant) -> EntityId {
        let id = self.alloc_id();
        let (dir_x, dir_y) = (spec.angle.cos(), spec.angle.sin());
        self.projectiles.insert(
            id,
            Projectile {
                id,
                owner: spec.owner,
                x: spec.x,
                y: spec.y,
                vx: dir_x * spec.speed,
                vy: dir_y * spec.speed,
                radius: spec.radius,
                damage: spec.damage,
                piercing: spec.piercing,
                pierced: Vec::new(),
                explosive: spec.explosive,
                chain_jumps: spec.chain_jumps,
                chained: Vec::new(),
                poison: spec.poison,
                ice: spec.ice,
                ignore_walls: spec.ignore_walls,
                expires_at: now + spec.lifetime,
            },
        );
        id
    }

    pub fn despawn_projectile(&mut self, id: EntityId) {
        self.projectiles.remove(&id);
    }

    pub fn spawn_particles(&mut self, x: f32, y: f32, color: u32, count: u32, now: Instant) {
        use rand::Rng;
        for _ in 0..count {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let speed = self.rng.gen_range(20.0..120.0);
            self.particles.push(Particle {
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                color,
                expires_at: now + Duration::from_millis(600),
            });
        }
    }
}

// Snapshot types published to the client channel each tick.

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub aim: f32,
    pub health: f32,
    pub max_health: f32,
    pub level: u32,
    pub combo: u32,
    pub score: u64,
}

#[derive(Debug, Clone)]
pub struct AdversarySnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub max_health: f32,
    pub size: f32,
    pub boss: bool,
    pub boss_phase: u8,
}

#[derive(Debug, Clone)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub hostile: bool,
}

#[derive(Debug, Clone)]
pub struct PickupSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            aim: p.aim,
            health: p.health,
            max_health: p.max_health,
            level: p.level,
            combo: p.combo,
            score: p.score,
        }
    }
}

impl From<&Adversary> for AdversarySnapshot {
    fn from(a: &Adversary) -> Self {
        Self {
            id: a.id,
            x: a.x,
            y: a.y,
            health: a.health,
            max_health: a.max_health,
            size: a.size,
            boss: a.kind.is_boss(),
            boss_phase: a.boss_phase,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            hostile: p.owner == Owner::Adversary,
        }
    }
}

impl From<&Pickup> for PickupSnapshot {
    fn from(p: &Pickup) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
        }
    }
}
