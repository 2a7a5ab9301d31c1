// Adversary sub-phase: exactly one type-specific ability handler per
// adversary per tick, then steering, wall resolution, separation, and
// contact damage.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::domain::ports::DeathSink;
use crate::domain::state::{
    AbilityState, Adversary, AdversaryKind, BossAbilityState, BossKind, EffectState, EntityId,
    Owner, PoisonTrail, ProjectileSpec, ToxicPool, World,
};
use crate::domain::systems::combat::{CombatResolver, DamageSource};
use crate::domain::systems::spatial::wall_contact;
use crate::domain::tuning::boss::{self, BossAbility};
use crate::domain::tuning::Tuning;

const SPIT_RANGE: f32 = 420.0;
const SPIT_PROJECTILE_SPEED: f32 = 300.0;
const BLINK_MIN_RANGE: f32 = 60.0;
const BLINK_MAX_RANGE: f32 = 140.0;
const SUMMON_COUNT: u32 = 2;
const REVIVE_LIMIT: usize = 2;
const BOSS_SUMMON_COUNT: u32 = 3;

/// Build and insert an adversary of `kind`, stats scaled for `wave`.
pub fn spawn_adversary(
    world: &mut World,
    kind: AdversaryKind,
    x: f32,
    y: f32,
    wave: u32,
    tuning: &Tuning,
    now: Instant,
) -> EntityId {
    let id = world.alloc_id();
    let (stats, max_health) = match kind {
        AdversaryKind::Boss(boss_kind) => {
            let spec = boss::spec(boss_kind);
            (
                crate::domain::tuning::adversary::KindStats {
                    health: spec.max_health,
                    speed: spec.speed,
                    size: spec.size,
                    contact_damage: spec.contact_damage,
                },
                spec.max_health,
            )
        }
        _ => {
            let s = tuning.adversary.stats_for_wave(kind, wave);
            (s, s.health)
        }
    };
    world.adversaries.insert(
        id,
        Adversary {
            id,
            kind,
            x,
            y,
            health: stats.health,
            max_health,
            speed: stats.speed,
            base_speed: stats.speed,
            size: stats.size,
            facing: 0.0,
            contact_damage: stats.contact_damage,
            boss_phase: 0,
            ability: initial_ability_state(kind, now),
            effects: EffectState::default(),
            despawn_at: None,
        },
    );
    id
}

fn initial_ability_state(kind: AdversaryKind, now: Instant) -> AbilityState {
    match kind {
        AdversaryKind::Spitter => AbilityState::Spitter {
            next_spit_at: now + Duration::from_millis(800),
        },
        AdversaryKind::Teleporter => AbilityState::Teleporter {
            next_blink_at: now + Duration::from_millis(1500),
        },
        AdversaryKind::Summoner => AbilityState::Summoner {
            next_summon_at: now + Duration::from_millis(2000),
        },
        AdversaryKind::Berserker => AbilityState::Berserker {
            enraged: false,
            next_dash_at: now + Duration::from_millis(1500),
            dash_until: None,
            dash_x: 0.0,
            dash_y: 0.0,
        },
        AdversaryKind::Necromancer => AbilityState::Necromancer {
            next_revive_at: now + Duration::from_millis(3000),
        },
        AdversaryKind::Slammer => AbilityState::Slammer {
            next_slam_at: now + Duration::from_millis(2000),
        },
        AdversaryKind::Shapeshifter => AbilityState::Shapeshifter {
            next_clone_at: now + Duration::from_millis(3000),
        },
        AdversaryKind::Splitter | AdversaryKind::Splinterling => AbilityState::Trailing {
            next_drop_at: now + Duration::from_millis(400),
        },
        AdversaryKind::Boss(_) => AbilityState::Boss(BossAbilityState {
            shield_until: None,
            next_slam_at: now + Duration::from_millis(3000),
            next_summon_at: now + Duration::from_millis(4000),
            next_ultimate_at: now + Duration::from_millis(6000),
            enraged: false,
        }),
        _ => AbilityState::None,
    }
}

/// Nearest living player this kind may target. Spawn-protected and
/// invisible players are skipped unless the kind ignores those states.
fn eligible_target(
    world: &World,
    x: f32,
    y: f32,
    kind: AdversaryKind,
    now: Instant,
) -> Option<(EntityId, f32, f32)> {
    let see_all = kind.ignores_stealth();
    world
        .players
        .values()
        .filter(|p| p.alive && (see_all || (!p.is_protected(now) && !p.is_invisible(now))))
        .map(|p| {
            let dx = p.x - x;
            let dy = p.y - y;
            (p.id, p.x, p.y, dx * dx + dy * dy)
        })
        .min_by(|a, b| a.3.total_cmp(&b.3))
        .map(|(id, px, py, _)| (id, px, py))
}

type AbilityHandler<D> = fn(&mut CombatResolver<D>, &mut World, EntityId, &Tuning, Instant);

/// Kind-to-handler lookup. At most one handler runs per adversary per tick.
fn handler_for<D: DeathSink>(kind: AdversaryKind) -> Option<AbilityHandler<D>> {
    match kind {
        AdversaryKind::Spitter => Some(spit),
        AdversaryKind::Teleporter => Some(blink),
        AdversaryKind::Summoner => Some(summon),
        AdversaryKind::Berserker => Some(rage_dash),
        AdversaryKind::Necromancer => Some(revive_corpses),
        AdversaryKind::Slammer => Some(ground_slam),
        AdversaryKind::Shapeshifter => Some(shapeshift),
        AdversaryKind::Splitter | AdversaryKind::Splinterling => Some(leave_trail),
        AdversaryKind::Boss(_) => Some(boss_abilities),
        _ => None,
    }
}

pub fn update_adversaries<D: DeathSink>(
    world: &mut World,
    resolver: &mut CombatResolver<D>,
    tuning: &Tuning,
    now: Instant,
) {
    let mut ids: Vec<EntityId> = world.adversaries.keys().copied().collect();
    ids.sort_unstable();

    for &id in &ids {
        let Some(a) = world.adversaries.get(&id) else {
            continue;
        };
        // Clones carry no abilities of their own.
        if a.despawn_at.is_some() {
            continue;
        }
        if let Some(handler) = handler_for::<D>(a.kind) {
            handler(resolver, world, id, tuning, now);
        }
    }

    for &id in &ids {
        move_adversary(world, id, tuning, now);
    }

    separate_adversaries(world, &ids, tuning);
    contact_damage(world, resolver, &ids, tuning, now);
}

fn move_adversary(world: &mut World, id: EntityId, tuning: &Tuning, now: Instant) {
    let delta = world.delta;
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    if a.speed <= 0.0 {
        return;
    }

    // A mid-dash berserker keeps its committed direction.
    let dash = match a.ability {
        AbilityState::Berserker {
            dash_until: Some(until),
            dash_x,
            dash_y,
            ..
        } if now < until => Some((dash_x, dash_y)),
        _ => None,
    };

    let (dir_x, dir_y) = match dash {
        Some(d) => d,
        None => {
            let Some((_, tx, ty)) = eligible_target(world, a.x, a.y, a.kind, now) else {
                return;
            };
            let dx = tx - a.x;
            let dy = ty - a.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < 1e-3 {
                return;
            }
            (dx / dist, dy / dist)
        }
    };

    let at = &tuning.adversary;
    let speed = match a.ability {
        AbilityState::Berserker {
            dash_until: Some(until),
            ..
        } if now < until => a.speed * at.dash_speed_factor,
        _ => a.speed,
    };
    let step = speed.min(at.max_speed) * delta.seconds;

    let (old_x, old_y, size) = (a.x, a.y, a.size);
    let mut nx = old_x + dir_x * step;
    let mut ny = old_y + dir_y * step;

    // Wall resolution: axis slide first, then soft repulsion, then a
    // center-ward unstick once penetration passes half the radius.
    let contact = wall_contact(&world.arena, nx, ny, size);
    if contact.colliding {
        if !wall_contact(&world.arena, nx, old_y, size).colliding {
            ny = old_y;
        } else if !wall_contact(&world.arena, old_x, ny, size).colliding {
            nx = old_x;
        } else {
            nx = old_x + contact.push_x * contact.penetration_depth * at.wall_repulsion;
            ny = old_y + contact.push_y * contact.penetration_depth * at.wall_repulsion;
            let still = wall_contact(&world.arena, nx, ny, size);
            if still.colliding && still.penetration_depth > size * 0.5 {
                let (cx, cy) = world.arena.center();
                let dx = cx - nx;
                let dy = cy - ny;
                let dist = (dx * dx + dy * dy).sqrt().max(1e-3);
                nx += dx / dist * at.unstick_push;
                ny += dy / dist * at.unstick_push;
                debug!(adversary_id = id, "unstick push applied");
            }
        }
    }

    let Some(a) = world.adversaries.get_mut(&id) else {
        return;
    };
    a.facing = (ny - old_y).atan2(nx - old_x);
    a.x = nx;
    a.y = ny;
}

/// Pairwise short-range separation so packs do not collapse into a point.
fn separate_adversaries(world: &mut World, ids: &[EntityId], tuning: &Tuning) {
    let at = &tuning.adversary;
    let delta = world.delta;
    let mut pushes: Vec<(EntityId, f32, f32)> = Vec::new();

    for (i, &a_id) in ids.iter().enumerate() {
        let Some(a) = world.adversaries.get(&a_id) else {
            continue;
        };
        for &b_id in &ids[i + 1..] {
            let Some(b) = world.adversaries.get(&b_id) else {
                continue;
            };
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let min_d = (a.size + b.size).max(at.separation_radius);
            let d_sq = dx * dx + dy * dy;
            if d_sq >= min_d * min_d {
                continue;
            }
            let d = d_sq.sqrt().max(1e-3);
            let overlap = (min_d - d) / min_d;
            let push = at.separation_push * overlap * delta.seconds;
            let (ux, uy) = (dx / d, dy / d);
            pushes.push((a_id, -ux * push, -uy * push));
            pushes.push((b_id, ux * push, uy * push));
        }
    }

    for (id, px, py) in pushes {
        if let Some(a) = world.adversaries.get_mut(&id) {
            a.x += px;
            a.y += py;
        }
    }
}

fn contact_damage<D: DeathSink>(
    world: &mut World,
    resolver: &mut CombatResolver<D>,
    ids: &[EntityId],
    tuning: &Tuning,
    now: Instant,
) {
    let pt = &tuning.player;
    let mut hits: Vec<(EntityId, EntityId, f32)> = Vec::new();

    for &aid in ids {
        let Some(a) = world.adversaries.get(&aid) else {
            continue;
        };
        let (ax, ay, reach, dmg) = (a.x, a.y, a.size + pt.radius, a.contact_damage);
        for p in world.players.values() {
            if !p.alive {
                continue;
            }
            let dx = p.x - ax;
            let dy = p.y - ay;
            if dx * dx + dy * dy <= reach * reach {
                hits.push((aid, p.id, dmg));
            }
        }
    }

    for (aid, pid, dmg) in hits {
        // Attribution map caps how often one adversary can reapply damage.
        let due = {
            let Some(p) = world.players.get_mut(&pid) else {
                continue;
            };
            match p.contact_damage_at.get(&aid) {
                Some(last) if now < *last + pt.contact_damage_interval => false,
                _ => {
                    p.contact_damage_at.insert(aid, now);
                    true
                }
            }
        };
        if due {
            resolver.damage_player(world, pid, dmg, DamageSource::Melee { adversary: aid }, now);
        }
    }
}

// Ability handlers. Each runs at most once per adversary per tick.

fn spit<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Spitter { next_spit_at } = a.ability else {
        return;
    };
    if now < next_spit_at {
        return;
    }
    let Some((_, tx, ty)) = eligible_target(world, a.x, a.y, a.kind, now) else {
        return;
    };
    let dx = tx - a.x;
    let dy = ty - a.y;
    if dx * dx + dy * dy > SPIT_RANGE * SPIT_RANGE {
        return;
    }
    let (x, y, dmg) = (a.x, a.y, a.contact_damage);
    let angle = dy.atan2(dx);
    world.spawn_projectile(
        ProjectileSpec {
            owner: Owner::Adversary,
            x,
            y,
            angle,
            speed: SPIT_PROJECTILE_SPEED,
            radius: tuning.projectile.radius,
            damage: dmg,
            piercing: 0,
            explosive: None,
            chain_jumps: 0,
            poison: false,
            ice: false,
            ignore_walls: false,
            lifetime: Duration::from_secs(2),
        },
        now,
    );
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Spitter {
            next_spit_at: now + tuning.adversary.spit_cooldown,
        };
    }
}

fn blink<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Teleporter { next_blink_at } = a.ability else {
        return;
    };
    if now < next_blink_at {
        return;
    }
    let Some((_, tx, ty)) = eligible_target(world, a.x, a.y, a.kind, now) else {
        return;
    };
    let (old_x, old_y, size) = (a.x, a.y, a.size);
    let angle = world.rng.gen_range(0.0..std::f32::consts::TAU);
    let range = world.rng.gen_range(BLINK_MIN_RANGE..BLINK_MAX_RANGE);
    let mut nx = tx + angle.cos() * range;
    let mut ny = ty + angle.sin() * range;
    if wall_contact(&world.arena, nx, ny, size).colliding {
        nx = old_x;
        ny = old_y;
    }
    world.spawn_particles(old_x, old_y, 0x_6a_21_9e, 6, now);
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.x = nx;
        a.y = ny;
        a.ability = AbilityState::Teleporter {
            next_blink_at: now + tuning.adversary.blink_cooldown,
        };
    }
    world.spawn_particles(nx, ny, 0x_6a_21_9e, 6, now);
}

fn summon<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Summoner { next_summon_at } = a.ability else {
        return;
    };
    if now < next_summon_at || world.adversaries.len() >= tuning.wave.max_active {
        return;
    }
    let (x, y, size) = (a.x, a.y, a.size);
    let wave = world.waves.wave;
    for i in 0..SUMMON_COUNT {
        let angle = std::f32::consts::TAU * (i as f32) / (SUMMON_COUNT as f32);
        spawn_adversary(
            world,
            AdversaryKind::Walker,
            x + angle.cos() * (size + 12.0),
            y + angle.sin() * (size + 12.0),
            wave,
            tuning,
            now,
        );
    }
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Summoner {
            next_summon_at: now + tuning.adversary.summon_cooldown,
        };
    }
}

fn rage_dash<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let at = &tuning.adversary;
    let Some(a) = world.adversaries.get_mut(&id) else {
        return;
    };
    let AbilityState::Berserker {
        mut enraged,
        mut next_dash_at,
        mut dash_until,
        mut dash_x,
        mut dash_y,
    } = a.ability
    else {
        return;
    };

    // Rage once, below half health; the speed bump survives status effects
    // because it raises the restored base.
    if !enraged && a.health <= a.max_health * 0.5 {
        enraged = true;
        a.base_speed *= 1.4;
        if a.effects.frozen.is_none() && a.effects.slowed.is_none() {
            a.speed = a.base_speed;
        }
    }

    if dash_until.is_some_and(|t| now >= t) {
        dash_until = None;
    }

    if dash_until.is_none() && now >= next_dash_at {
        let (x, y, kind) = (a.x, a.y, a.kind);
        if let Some((_, tx, ty)) = eligible_target(world, x, y, kind, now) {
            let dx = tx - x;
            let dy = ty - y;
            let dist = (dx * dx + dy * dy).sqrt().max(1e-3);
            dash_x = dx / dist;
            dash_y = dy / dist;
            dash_until = Some(now + at.dash_duration);
            next_dash_at = now + at.dash_cooldown;
        }
    }

    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Berserker {
            enraged,
            next_dash_at,
            dash_until,
            dash_x,
            dash_y,
        };
    }
}

fn revive_corpses<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let at = &tuning.adversary;
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Necromancer { next_revive_at } = a.ability else {
        return;
    };
    if now < next_revive_at {
        return;
    }
    let (x, y) = (a.x, a.y);
    let wave = world.waves.wave;
    let r_sq = at.revive_radius * at.revive_radius;

    let mut raised = 0usize;
    let mut kept = Vec::with_capacity(world.corpses.len());
    for corpse in std::mem::take(&mut world.corpses) {
        let dx = corpse.x - x;
        let dy = corpse.y - y;
        if raised < REVIVE_LIMIT && dx * dx + dy * dy <= r_sq {
            raised += 1;
            spawn_adversary(world, corpse.kind, corpse.x, corpse.y, wave, tuning, now);
            world.spawn_particles(corpse.x, corpse.y, 0x_2e_7d_32, 6, now);
        } else {
            kept.push(corpse);
        }
    }
    world.corpses = kept;

    if raised > 0
        && let Some(a) = world.adversaries.get_mut(&id)
    {
        a.ability = AbilityState::Necromancer {
            next_revive_at: now + at.revive_cooldown,
        };
    }
}

fn ground_slam<D: DeathSink>(
    resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let at = &tuning.adversary;
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Slammer { next_slam_at } = a.ability else {
        return;
    };
    if now < next_slam_at {
        return;
    }
    let (x, y) = (a.x, a.y);
    let in_reach = world.players.values().any(|p| {
        let dx = p.x - x;
        let dy = p.y - y;
        p.alive && dx * dx + dy * dy <= at.slam_radius * at.slam_radius
    });
    if !in_reach {
        return;
    }
    slam_area(resolver, world, x, y, at.slam_radius, at.slam_damage, now);
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Slammer {
            next_slam_at: now + at.slam_cooldown,
        };
    }
}

fn slam_area<D: DeathSink>(
    resolver: &mut CombatResolver<D>,
    world: &mut World,
    x: f32,
    y: f32,
    radius: f32,
    damage: f32,
    now: Instant,
) {
    let r_sq = radius * radius;
    let hit: Vec<EntityId> = world
        .players
        .values()
        .filter(|p| {
            let dx = p.x - x;
            let dy = p.y - y;
            p.alive && dx * dx + dy * dy <= r_sq
        })
        .map(|p| p.id)
        .collect();
    world.spawn_particles(x, y, 0x_9e_6a_21, 12, now);
    for pid in hit {
        resolver.damage_player(world, pid, damage, DamageSource::GroundSlam, now);
    }
}

fn shapeshift<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let at = &tuning.adversary;
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Shapeshifter { next_clone_at } = a.ability else {
        return;
    };
    if now < next_clone_at || world.adversaries.len() >= tuning.wave.max_active {
        return;
    }
    let (x, y, health, speed, size, dmg, kind) = (
        a.x,
        a.y,
        a.max_health * 0.4,
        a.base_speed,
        a.size,
        a.contact_damage * 0.5,
        a.kind,
    );
    let clone_id = world.alloc_id();
    world.adversaries.insert(
        clone_id,
        Adversary {
            id: clone_id,
            kind,
            x: x + size * 1.5,
            y,
            health,
            max_health: health,
            speed,
            base_speed: speed,
            size,
            facing: 0.0,
            contact_damage: dmg,
            boss_phase: 0,
            ability: AbilityState::None,
            effects: EffectState::default(),
            despawn_at: Some(now + at.clone_lifetime),
        },
    );
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Shapeshifter {
            next_clone_at: now + at.clone_cooldown,
        };
    }
}

/// Trailing kinds shed a poison-trail segment at their position on a fixed
/// cadence. The segments damage players in `systems::hazards`.
fn leave_trail<D: DeathSink>(
    _resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let at = &tuning.adversary;
    let Some(a) = world.adversaries.get(&id) else {
        return;
    };
    let AbilityState::Trailing { next_drop_at } = a.ability else {
        return;
    };
    if now < next_drop_at {
        return;
    }
    let (x, y) = (a.x, a.y);
    let trail_id = world.alloc_id();
    world.poison_trails.insert(
        trail_id,
        PoisonTrail {
            id: trail_id,
            x,
            y,
            radius: at.trail_radius,
            damage: at.trail_damage,
            expires_at: now + at.trail_lifetime,
        },
    );
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Trailing {
            next_drop_at: now + at.trail_drop_interval,
        };
    }
}

/// Boss handler: phase-gated ability sets, at most one firing per tick.
fn boss_abilities<D: DeathSink>(
    resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    tuning: &Tuning,
    now: Instant,
) {
    let Some(a) = world.adversaries.get_mut(&id) else {
        return;
    };
    let AdversaryKind::Boss(kind) = a.kind else {
        return;
    };
    let spec = boss::spec(kind);

    // Phase only climbs, even if health is later restored.
    let fraction = (a.health / a.max_health).max(0.0);
    a.boss_phase = a.boss_phase.max(spec.phase_for_fraction(fraction));
    let phase = a.boss_phase;

    let AbilityState::Boss(mut state) = a.ability else {
        return;
    };
    let (x, y) = (a.x, a.y);

    let fired = fire_boss_ability(resolver, world, id, kind, phase, &mut state, x, y, tuning, now);
    if let Some(a) = world.adversaries.get_mut(&id) {
        a.ability = AbilityState::Boss(state);
        if fired == Some(BossAbility::Enrage) {
            a.base_speed *= 1.5;
            a.contact_damage *= 1.3;
            if a.effects.frozen.is_none() && a.effects.slowed.is_none() {
                a.speed = a.base_speed;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fire_boss_ability<D: DeathSink>(
    resolver: &mut CombatResolver<D>,
    world: &mut World,
    id: EntityId,
    kind: BossKind,
    phase: u8,
    state: &mut BossAbilityState,
    x: f32,
    y: f32,
    tuning: &Tuning,
    now: Instant,
) -> Option<BossAbility> {
    let spec = boss::spec(kind);
    let at = &tuning.adversary;

    if spec.unlocked(phase, BossAbility::GroundSlam) && now >= state.next_slam_at {
        let radius = at.slam_radius * 1.4;
        let reachable = world.players.values().any(|p| {
            let dx = p.x - x;
            let dy = p.y - y;
            p.alive && dx * dx + dy * dy <= radius * radius
        });
        if reachable {
            state.next_slam_at = now + spec.slam_cooldown;
            slam_area(resolver, world, x, y, radius, at.slam_damage * 1.6, now);
            return Some(BossAbility::GroundSlam);
        }
    }

    if spec.unlocked(phase, BossAbility::SummonMinions)
        && now >= state.next_summon_at
        && world.adversaries.len() < tuning.wave.max_active
    {
        state.next_summon_at = now + spec.summon_cooldown;
        let wave = world.waves.wave;
        for i in 0..BOSS_SUMMON_COUNT {
            let angle = std::f32::consts::TAU * (i as f32) / (BOSS_SUMMON_COUNT as f32);
            spawn_adversary(
                world,
                AdversaryKind::Runner,
                x + angle.cos() * 60.0,
                y + angle.sin() * 60.0,
                wave,
                tuning,
                now,
            );
        }
        return Some(BossAbility::SummonMinions);
    }

    if spec.unlocked(phase, BossAbility::ShieldWall)
        && now >= state.next_ultimate_at
        && state.shield_until.is_none_or(|t| now >= t)
    {
        state.next_ultimate_at = now + spec.ultimate_cooldown;
        state.shield_until = Some(now + spec.shield_duration);
        return Some(BossAbility::ShieldWall);
    }

    if spec.unlocked(phase, BossAbility::ToxicBurst) && now >= state.next_ultimate_at {
        state.next_ultimate_at = now + spec.ultimate_cooldown;
        let targets: Vec<(f32, f32)> = world
            .players
            .values()
            .filter(|p| p.alive)
            .take(2)
            .map(|p| (p.x, p.y))
            .collect();
        for (px, py) in targets {
            let pool_id = world.alloc_id();
            world.toxic_pools.insert(
                pool_id,
                ToxicPool {
                    id: pool_id,
                    x: px,
                    y: py,
                    radius: 70.0,
                    damage: 6.0,
                    expires_at: now + Duration::from_secs(5),
                    last_damage_at: None,
                },
            );
            world.spawn_particles(px, py, 0x_2e_7d_32, 8, now);
        }
        return Some(BossAbility::ToxicBurst);
    }

    if spec.unlocked(phase, BossAbility::FrostNova) && now >= state.next_ultimate_at {
        state.next_ultimate_at = now + spec.ultimate_cooldown;
        slam_area(resolver, world, x, y, 180.0, 12.0, now);
        world.spawn_particles(x, y, 0x_4f_c3_f7, 16, now);
        return Some(BossAbility::FrostNova);
    }

    if spec.unlocked(phase, BossAbility::Enrage) && !state.enraged {
        state.enraged = true;
        return Some(BossAbility::Enrage);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Arena, DeltaTime, Player, SessionStats};
    use crate::domain::systems::players::tests_support;

    struct Sink;
    impl DeathSink for Sink {
        fn record_death(&mut self, _: &Player, _: SessionStats, _: Instant) {}
    }

    fn setup() -> (World, CombatResolver<Sink>, Tuning, Instant) {
        let mut world = World::new(Arena::default(), 5);
        world.delta = DeltaTime {
            seconds: 1.0 / 60.0,
            multiplier: 1.0,
        };
        let tuning = Tuning::default();
        let resolver = CombatResolver::new(Sink, tuning.clone());
        (world, resolver, tuning, Instant::now())
    }

    fn add_player(world: &mut World, x: f32, y: f32, now: Instant) -> EntityId {
        let mut p = tests_support::player(now);
        p.x = x;
        p.y = y;
        let id = p.id;
        world.players.insert(id, p);
        id
    }

    #[test]
    fn separation_pushes_overlapping_pair_apart() {
        let (mut world, _, tuning, now) = setup();
        let a = spawn_adversary(&mut world, AdversaryKind::Walker, 0.0, 0.0, 1, &tuning, now);
        let b = spawn_adversary(&mut world, AdversaryKind::Walker, 4.0, 0.0, 1, &tuning, now);

        let before = world.adversaries[&b].x - world.adversaries[&a].x;
        separate_adversaries(&mut world, &[a, b], &tuning);
        let after = world.adversaries[&b].x - world.adversaries[&a].x;

        assert!(after > before, "overlap did not widen: {before} -> {after}");
    }

    #[test]
    fn movement_slides_along_the_boundary() {
        let (mut world, _, tuning, now) = setup();
        add_player(&mut world, 100.0, 539.0, now);

        // Flush against the top wall, target below-left: the y step is
        // blocked but the x component still closes in.
        let id = spawn_adversary(&mut world, AdversaryKind::Walker, 200.0, 526.0, 1, &tuning, now);
        move_adversary(&mut world, id, &tuning, now);

        let a = &world.adversaries[&id];
        assert!(a.x < 200.0);
        assert_eq!(a.y, 526.0);
    }

    #[test]
    fn deep_wall_penetration_gets_unstuck_toward_center() {
        let (mut world, _, tuning, now) = setup();
        add_player(&mut world, 900.0, 500.0, now);

        // Embedded past both bounds at the corner; axis slides both fail.
        let id = spawn_adversary(&mut world, AdversaryKind::Walker, 975.0, 555.0, 1, &tuning, now);
        move_adversary(&mut world, id, &tuning, now);

        let a = &world.adversaries[&id];
        assert!(a.x < 975.0);
        assert!(a.y < 555.0);
    }

    #[test]
    fn spitter_fires_once_per_cooldown() {
        let (mut world, mut resolver, tuning, now) = setup();
        add_player(&mut world, 100.0, 0.0, now);
        let id = spawn_adversary(&mut world, AdversaryKind::Spitter, 0.0, 0.0, 1, &tuning, now);
        world.adversaries.get_mut(&id).unwrap().ability =
            AbilityState::Spitter { next_spit_at: now };

        update_adversaries(&mut world, &mut resolver, &tuning, now);
        let hostile = |w: &World| {
            w.projectiles
                .values()
                .filter(|p| p.owner == Owner::Adversary)
                .count()
        };
        assert_eq!(hostile(&world), 1);

        // Cooling down: a second pass in the same instant stays quiet.
        update_adversaries(&mut world, &mut resolver, &tuning, now);
        assert_eq!(hostile(&world), 1);

        update_adversaries(&mut world, &mut resolver, &tuning, now + tuning.adversary.spit_cooldown);
        assert_eq!(hostile(&world), 2);
    }

    #[test]
    fn berserker_rages_once_below_half_health() {
        let (mut world, mut resolver, tuning, now) = setup();
        add_player(&mut world, 300.0, 0.0, now);
        let id = spawn_adversary(&mut world, AdversaryKind::Berserker, 0.0, 0.0, 1, &tuning, now);
        let base = world.adversaries[&id].base_speed;
        world.adversaries.get_mut(&id).unwrap().health = 1.0;

        update_adversaries(&mut world, &mut resolver, &tuning, now);
        let raged = world.adversaries[&id].base_speed;
        assert!(raged > base);

        // Raging is one-shot; another pass does not compound it.
        update_adversaries(&mut world, &mut resolver, &tuning, now);
        assert_eq!(world.adversaries[&id].base_speed, raged);
    }

    #[test]
    fn shapeshifter_clone_is_timed_and_inert() {
        let (mut world, mut resolver, tuning, now) = setup();
        add_player(&mut world, 300.0, 0.0, now);
        let id = spawn_adversary(&mut world, AdversaryKind::Shapeshifter, 0.0, 0.0, 1, &tuning, now);
        world.adversaries.get_mut(&id).unwrap().ability =
            AbilityState::Shapeshifter { next_clone_at: now };

        update_adversaries(&mut world, &mut resolver, &tuning, now);

        let clone = world
            .adversaries
            .values()
            .find(|a| a.despawn_at.is_some())
            .expect("no clone spawned");
        assert_eq!(clone.despawn_at, Some(now + tuning.adversary.clone_lifetime));
        assert!(matches!(clone.ability, AbilityState::None));
    }

    #[test]
    fn splitter_sheds_trail_segments_on_a_cadence() {
        let (mut world, mut resolver, tuning, now) = setup();
        add_player(&mut world, 300.0, 0.0, now);
        let id = spawn_adversary(&mut world, AdversaryKind::Splitter, 0.0, 0.0, 1, &tuning, now);
        world.adversaries.get_mut(&id).unwrap().ability =
            AbilityState::Trailing { next_drop_at: now };

        update_adversaries(&mut world, &mut resolver, &tuning, now);
        assert_eq!(world.poison_trails.len(), 1);

        update_adversaries(&mut world, &mut resolver, &tuning, now);
        assert_eq!(world.poison_trails.len(), 1);

        let later = now + tuning.adversary.trail_drop_interval;
        update_adversaries(&mut world, &mut resolver, &tuning, later);
        assert_eq!(world.poison_trails.len(), 2);
    }

    #[test]
    fn boss_slam_respects_range_and_cooldown() {
        let (mut world, mut resolver, tuning, now) = setup();
        // Outside melee reach, inside the boss slam radius.
        let pid = add_player(&mut world, 100.0, 0.0, now);
        let id = spawn_adversary(
            &mut world,
            AdversaryKind::Boss(BossKind::Behemoth),
            0.0,
            0.0,
            5,
            &tuning,
            now,
        );
        world.adversaries.get_mut(&id).unwrap().ability = AbilityState::Boss(BossAbilityState {
            shield_until: None,
            next_slam_at: now,
            next_summon_at: now + Duration::from_secs(60),
            next_ultimate_at: now + Duration::from_secs(60),
            enraged: false,
        });

        update_adversaries(&mut world, &mut resolver, &tuning, now);
        let after_slam = world.players[&pid].health;
        assert!(after_slam < 100.0);

        // Back-to-back passes in the same instant stay on cooldown.
        update_adversaries(&mut world, &mut resolver, &tuning, now);
        assert_eq!(world.players[&pid].health, after_slam);
    }

    #[test]
    fn targeting_skips_invisible_players() {
        let (mut world, _, tuning, now) = setup();
        let pid = add_player(&mut world, 0.0, 0.0, now);
        world.players.get_mut(&pid).unwrap().invisible_until =
            Some(now + Duration::from_secs(5));

        let id = spawn_adversary(&mut world, AdversaryKind::Walker, 200.0, 0.0, 1, &tuning, now);
        move_adversary(&mut world, id, &tuning, now);
        assert_eq!(world.adversaries[&id].x, 200.0);

        // A necromancer tracks players through stealth.
        let necro = spawn_adversary(&mut world, AdversaryKind::Necromancer, 200.0, 50.0, 1, &tuning, now);
        move_adversary(&mut world, necro, &tuning, now);
        assert!(world.adversaries[&necro].x < 200.0);
    }
}
