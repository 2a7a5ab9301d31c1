// Expiry sweep: timed entities leave the world here and nowhere else.
// Running the sweep twice at the same instant is a no-op.

use std::time::Instant;

use crate::domain::state::{EntityId, World};

/// Cosmetic particle drift. Separate from the expiry sweep so the sweep
/// stays idempotent.
pub fn integrate_particles(world: &mut World) {
    let dt = world.delta.seconds;
    for p in &mut world.particles {
        p.x += p.vx * dt;
        p.y += p.vy * dt;
    }
}

pub fn cleanup_expired(world: &mut World, now: Instant) {
    world.particles.retain(|p| now < p.expires_at);
    world.corpses.retain(|c| now < c.expires_at);
    world.hazards.retain(|_, h| now < h.expires_at);
    world.toxic_pools.retain(|_, p| now < p.expires_at);
    world.poison_trails.retain(|_, t| now < t.expires_at);
    world.pickups.retain(|_, p| now < p.expires_at);
    world.projectiles.retain(|_, p| now < p.expires_at);

    // Timed adversaries (clones) vanish without loot, signals or corpses.
    let expired: Vec<EntityId> = world
        .adversaries
        .values()
        .filter(|a| a.despawn_at.is_some_and(|t| now >= t))
        .map(|a| a.id)
        .collect();
    for id in expired {
        if let Some(a) = world.adversaries.remove(&id) {
            world.spawn_particles(a.x, a.y, 0x_90_a4_ae, 4, now);
        }
    }
}

/// Drop attribution entries whose source entity is gone. Ids are never
/// reused, so a dangling entry can only grow stale, never ambiguous; this
/// runs on a low cadence purely to bound map growth.
pub fn purge_attribution(world: &mut World) {
    let adversaries: Vec<EntityId> = world.adversaries.keys().copied().collect();
    let trails: Vec<EntityId> = world.poison_trails.keys().copied().collect();
    for p in world.players.values_mut() {
        p.contact_damage_at.retain(|id, _| adversaries.contains(id));
        p.trail_damage_at.retain(|id, _| trails.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Arena, Corpse, AdversaryKind, Particle, PoisonTrail};
    use std::time::Duration;

    #[test]
    fn sweep_is_idempotent() {
        let t0 = Instant::now();
        let mut w = World::new(Arena::default(), 3);
        w.particles.push(Particle {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            color: 0,
            expires_at: t0 + Duration::from_millis(100),
        });
        w.corpses.push(Corpse {
            x: 0.0,
            y: 0.0,
            kind: AdversaryKind::Walker,
            expires_at: t0 + Duration::from_secs(1),
        });

        let later = t0 + Duration::from_millis(200);
        cleanup_expired(&mut w, later);
        assert!(w.particles.is_empty());
        assert_eq!(w.corpses.len(), 1);

        // Second pass at the same instant removes nothing further.
        let particles = w.particles.len();
        let corpses = w.corpses.len();
        cleanup_expired(&mut w, later);
        assert_eq!(w.particles.len(), particles);
        assert_eq!(w.corpses.len(), corpses);
    }

    #[test]
    fn purge_drops_attribution_for_gone_sources() {
        let t0 = Instant::now();
        let mut w = World::new(Arena::default(), 3);
        let live_trail = w.alloc_id();
        w.poison_trails.insert(
            live_trail,
            PoisonTrail {
                id: live_trail,
                x: 0.0,
                y: 0.0,
                radius: 12.0,
                damage: 2.5,
                expires_at: t0 + Duration::from_secs(4),
            },
        );
        let gone_trail = w.alloc_id();
        let gone_adversary = w.alloc_id();

        let mut p = crate::domain::systems::players::tests_support::player(t0);
        p.trail_damage_at.insert(live_trail, t0);
        p.trail_damage_at.insert(gone_trail, t0);
        p.contact_damage_at.insert(gone_adversary, t0);
        w.players.insert(p.id, p);

        purge_attribution(&mut w);
        let p = &w.players[&1];
        assert!(p.trail_damage_at.contains_key(&live_trail));
        assert!(!p.trail_damage_at.contains_key(&gone_trail));
        assert!(p.contact_damage_at.is_empty());
    }
}
