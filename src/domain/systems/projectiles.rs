// Projectile sub-phase: sub-stepped integration against the rebuilt
// spatial index, wall and lifetime destruction, and hit dispatch into
// combat resolution.

use std::time::Instant;

use crate::domain::ports::DeathSink;
use crate::domain::state::{EntityId, Owner, World};
use crate::domain::systems::combat::CombatResolver;
use crate::domain::systems::spatial::SpatialIndex;
use crate::domain::tuning::Tuning;

/// Smallest body a projectile can collide with; sub-step length derives
/// from it so a full-speed projectile cannot pass through one in a step.
const MIN_TARGET_RADIUS: f32 = 10.0;

/// Broad-phase query padding: the largest adversary radius in play.
const MAX_ADVERSARY_RADIUS: f32 = 48.0;

const PARTICLE_WALL: u32 = 0x_9e_9e_9e;

pub fn update_projectiles<D: DeathSink>(
    world: &mut World,
    resolver: &mut CombatResolver<D>,
    index: &SpatialIndex,
    tuning: &Tuning,
    now: Instant,
) {
    let mut ids: Vec<EntityId> = world.projectiles.keys().copied().collect();
    ids.sort_unstable();

    'projectiles: for id in ids {
        let Some(p) = world.projectiles.get(&id) else {
            continue;
        };
        if now >= p.expires_at {
            world.despawn_projectile(id);
            continue;
        }

        let pt = &tuning.projectile;
        let (owner, radius, ignore_walls) = (p.owner, p.radius, p.ignore_walls);
        let (start_x, start_y) = (p.x, p.y);
        let dt = world.delta.seconds;
        let (dx, dy) = (p.vx * dt, p.vy * dt);
        let distance = (dx * dx + dy * dy).sqrt();

        let step_len = (pt.substep_fraction * (radius + MIN_TARGET_RADIUS)).max(1.0);
        let steps = ((distance / step_len).ceil() as u32).clamp(1, pt.max_substeps);

        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let x = start_x + dx * t;
            let y = start_y + dy * t;

            if !ignore_walls && index.check_wall_collision(x, y, radius) {
                world.spawn_particles(x, y, PARTICLE_WALL, 3, now);
                world.despawn_projectile(id);
                continue 'projectiles;
            }

            match owner {
                Owner::Player(_) => {
                    if let Some(target) =
                        first_adversary_overlap(world, index, id, x, y, radius)
                    {
                        commit_position(world, id, x, y);
                        if resolver.projectile_hit_adversary(world, index, id, target, now) {
                            continue 'projectiles;
                        }
                    }
                }
                Owner::Adversary => {
                    if let Some(target) = first_player_overlap(world, x, y, radius, tuning) {
                        commit_position(world, id, x, y);
                        resolver.projectile_hit_player(world, id, target, now);
                        continue 'projectiles;
                    }
                }
            }
        }

        commit_position(world, id, start_x + dx, start_y + dy);
    }
}

fn commit_position(world: &mut World, id: EntityId, x: f32, y: f32) {
    if let Some(p) = world.projectiles.get_mut(&id) {
        p.x = x;
        p.y = y;
    }
}

/// Nearest adversary overlapping the projectile at (x, y) that it has not
/// already pierced.
fn first_adversary_overlap(
    world: &World,
    index: &SpatialIndex,
    projectile_id: EntityId,
    x: f32,
    y: f32,
    radius: f32,
) -> Option<EntityId> {
    let Some(p) = world.projectiles.get(&projectile_id) else {
        return None;
    };
    let candidates = index.adversaries_in_radius(x, y, radius + MAX_ADVERSARY_RADIUS, None);

    let mut best: Option<(EntityId, f32)> = None;
    for aid in candidates {
        if p.pierced.contains(&aid) {
            continue;
        }
        let Some(a) = world.adversaries.get(&aid) else {
            continue;
        };
        let dx = a.x - x;
        let dy = a.y - y;
        let reach = a.size + radius;
        let d_sq = dx * dx + dy * dy;
        if d_sq <= reach * reach && best.is_none_or(|(_, b)| d_sq < b) {
            best = Some((aid, d_sq));
        }
    }
    best.map(|(id, _)| id)
}

fn first_player_overlap(
    world: &World,
    x: f32,
    y: f32,
    radius: f32,
    tuning: &Tuning,
) -> Option<EntityId> {
    let reach = radius + tuning.player.radius;
    let reach_sq = reach * reach;
    world
        .players
        .values()
        .filter(|p| {
            let dx = p.x - x;
            let dy = p.y - y;
            p.alive && dx * dx + dy * dy <= reach_sq
        })
        .map(|p| {
            let dx = p.x - x;
            let dy = p.y - y;
            (p.id, dx * dx + dy * dy)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
