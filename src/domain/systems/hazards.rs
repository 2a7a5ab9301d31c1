// Hazard sub-phase: standing hazards and toxic pools tick damage on a
// shared per-emitter rate limit; poison trails attribute per player.

use std::time::{Duration, Instant};

use crate::domain::ports::DeathSink;
use crate::domain::state::{EntityId, World};
use crate::domain::systems::combat::{CombatResolver, DamageSource};
use crate::domain::systems::spatial::SpatialIndex;
use crate::domain::tuning::Tuning;

const HAZARD_DAMAGE_INTERVAL: Duration = Duration::from_millis(500);

pub fn update_hazards<D: DeathSink>(
    world: &mut World,
    resolver: &mut CombatResolver<D>,
    index: &SpatialIndex,
    tuning: &Tuning,
    now: Instant,
) {
    let mut hits: Vec<(EntityId, f32, DamageSource)> = Vec::new();

    for h in world.hazards.values_mut() {
        if h.last_damage_at
            .is_some_and(|t| now < t + HAZARD_DAMAGE_INTERVAL)
        {
            continue;
        }
        let victims = index.players_in_radius(h.x, h.y, h.radius);
        if victims.is_empty() {
            continue;
        }
        h.last_damage_at = Some(now);
        for pid in victims {
            hits.push((pid, h.damage, DamageSource::Hazard));
        }
    }

    for pool in world.toxic_pools.values_mut() {
        if pool
            .last_damage_at
            .is_some_and(|t| now < t + HAZARD_DAMAGE_INTERVAL)
        {
            continue;
        }
        let victims = index.players_in_radius(pool.x, pool.y, pool.radius);
        if victims.is_empty() {
            continue;
        }
        pool.last_damage_at = Some(now);
        for pid in victims {
            hits.push((pid, pool.damage, DamageSource::ToxicPool));
        }
    }

    // Trails are dense and overlapping, so the rate limit lives on the
    // player side, keyed by trail id.
    let interval = tuning.player.trail_damage_interval;
    let trails: Vec<(EntityId, f32, f32, f32, f32)> = world
        .poison_trails
        .values()
        .map(|t| (t.id, t.x, t.y, t.radius, t.damage))
        .collect();
    for (tid, tx, ty, tr, damage) in trails {
        for pid in index.players_in_radius(tx, ty, tr + tuning.player.radius) {
            let Some(p) = world.players.get_mut(&pid) else {
                continue;
            };
            match p.trail_damage_at.get(&tid) {
                Some(last) if now < *last + interval => {}
                _ => {
                    p.trail_damage_at.insert(tid, now);
                    hits.push((pid, damage, DamageSource::Trail));
                }
            }
        }
    }

    for (pid, damage, source) in hits {
        resolver.damage_player(world, pid, damage, source, now);
    }
}
