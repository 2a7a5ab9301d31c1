// Player sub-phase: modifier expiry, combo windows, regeneration,
// input-driven movement, and weapon fire.

use std::time::Instant;

use crate::domain::ports::DeathSink;
use crate::domain::state::{EntityId, Notification, Owner, PickupKind, ProjectileSpec, World};
use crate::domain::systems::combat::CombatResolver;
use crate::domain::systems::spatial::wall_contact;
use crate::domain::tuning::Tuning;

/// Damage multiplier while a weapon-boost modifier is active.
const WEAPON_BOOST_FACTOR: f32 = 1.5;

pub fn update_players(world: &mut World, tuning: &Tuning, now: Instant) {
    let ids: Vec<_> = world.players.keys().copied().collect();
    let mut shots: Vec<ProjectileSpec> = Vec::new();
    let mut resets: Vec<Notification> = Vec::new();
    let delta = world.delta;
    let arena = world.arena.clone();
    let pt = &tuning.player;

    for id in ids {
        let Some(p) = world.players.get_mut(&id) else {
            continue;
        };

        // Expired timed modifiers are cleared eagerly so snapshots never
        // carry stale flags.
        for slot in [
            &mut p.speed_boost_until,
            &mut p.weapon_boost_until,
            &mut p.spawn_protection_until,
            &mut p.invisible_until,
        ] {
            if slot.is_some_and(|t| now >= t) {
                *slot = None;
            }
        }

        // A combo resets exactly once when its window lapses.
        if let Some(expires) = p.combo_expires_at
            && now >= expires
        {
            p.highest_combo = p.highest_combo.max(p.combo);
            p.combo = 0;
            p.combo_expires_at = None;
            resets.push(Notification::ComboReset {
                player_id: p.id,
                best: p.highest_combo,
            });
        }

        if !p.alive {
            continue;
        }

        // Passive regeneration: missed intervals are applied in whole ticks,
        // capped per frame so a stall never heals to full instantly.
        let mut applied = 0;
        while applied < pt.regen_catchup_ticks && p.last_regen_at + pt.regen_interval <= now {
            p.last_regen_at += pt.regen_interval;
            if p.health < p.max_health {
                p.health = (p.health + pt.regen_per_tick).min(p.max_health);
            }
            applied += 1;
        }
        // Drop any remaining backlog past the cap.
        while p.last_regen_at + pt.regen_interval <= now {
            p.last_regen_at += pt.regen_interval;
        }

        // Input-driven movement with wall slide, mirroring adversary wall
        // resolution but without the repulsion fallbacks; players just stop.
        let input = p.last_input;
        let (mx, my) = (input.move_x, input.move_y);
        if mx != 0.0 || my != 0.0 {
            let len = (mx * mx + my * my).sqrt();
            let speed = if p.has_speed_boost(now) {
                pt.move_speed * pt.speed_boost_factor
            } else {
                pt.move_speed
            };
            let step = speed * delta.seconds;
            let nx = p.x + mx / len * step;
            let ny = p.y + my / len * step;
            if !wall_contact(&arena, nx, ny, pt.radius).colliding {
                p.x = nx;
                p.y = ny;
            } else if !wall_contact(&arena, nx, p.y, pt.radius).colliding {
                p.x = nx;
            } else if !wall_contact(&arena, p.x, ny, pt.radius).colliding {
                p.y = ny;
            }
        }
        p.aim = input.aim;

        // Weapons fire independently; auto-fire weapons ignore the fire input.
        let boosted = p.has_weapon_boost(now);
        let (px, py, aim, owner) = (p.x, p.y, p.aim, Owner::Player(p.id));
        for weapon in &mut p.weapons {
            let ready = weapon
                .last_fired_at
                .is_none_or(|t| now >= t + weapon.cooldown);
            if !ready || !(weapon.auto_fire || input.firing) {
                continue;
            }
            weapon.last_fired_at = Some(now);
            let damage = if boosted {
                weapon.damage * WEAPON_BOOST_FACTOR
            } else {
                weapon.damage
            };
            shots.push(ProjectileSpec {
                owner,
                x: px,
                y: py,
                angle: aim,
                speed: weapon.projectile_speed,
                radius: tuning.projectile.radius,
                damage,
                piercing: weapon.piercing,
                explosive: weapon.explosive,
                chain_jumps: weapon.chain_jumps,
                poison: weapon.poison,
                ice: weapon.ice,
                ignore_walls: false,
                lifetime: tuning.projectile.lifetime,
            });
        }
    }

    for n in resets {
        world.notify(n);
    }
    for spec in shots {
        world.spawn_projectile(spec, now);
    }
}

/// Pickup phase: first player overlapping a pickup collects it.
pub fn collect_pickups<D: DeathSink>(
    world: &mut World,
    resolver: &mut CombatResolver<D>,
    tuning: &Tuning,
    now: Instant,
) {
    let reach = tuning.player.pickup_radius;
    let reach_sq = reach * reach;

    let mut collected: Vec<(EntityId, EntityId, PickupKind)> = Vec::new();
    for pickup in world.pickups.values() {
        let taker = world
            .players
            .values()
            .filter(|p| {
                let dx = p.x - pickup.x;
                let dy = p.y - pickup.y;
                p.alive && dx * dx + dy * dy <= reach_sq
            })
            .map(|p| p.id)
            .min();
        if let Some(pid) = taker {
            collected.push((pickup.id, pid, pickup.kind));
        }
    }

    for (pickup_id, pid, kind) in collected {
        world.pickups.remove(&pickup_id);
        match kind {
            PickupKind::Gold(amount) => {
                if let Some(p) = world.players.get_mut(&pid) {
                    p.gold += amount;
                    p.score += amount;
                }
            }
            PickupKind::Experience(xp) => resolver.award_experience(world, pid, xp),
            PickupKind::Heal(amount) => {
                if let Some(p) = world.players.get_mut(&pid) {
                    p.health = (p.health + amount).min(p.max_health);
                }
            }
            PickupKind::SpeedBoost(duration) => {
                if let Some(p) = world.players.get_mut(&pid) {
                    p.speed_boost_until = Some(now + duration);
                }
            }
            PickupKind::WeaponBoost(duration) => {
                if let Some(p) = world.players.get_mut(&pid) {
                    p.weapon_boost_until = Some(now + duration);
                }
            }
            PickupKind::Invisibility(duration) => {
                if let Some(p) = world.players.get_mut(&pid) {
                    p.invisible_until = Some(now + duration);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::tests_support::player_with_id;
    use super::*;
    use crate::domain::state::{Arena, DeltaTime, Player, PlayerInput, Weapon};
    use std::time::Duration;

    fn test_player(id: u64, now: Instant) -> Player {
        player_with_id(id, now)
    }

    fn world_with(p: Player) -> World {
        let mut w = World::new(Arena::default(), 7);
        w.delta = DeltaTime {
            seconds: 1.0 / 60.0,
            multiplier: 1.0,
        };
        w.players.insert(p.id, p);
        w
    }

    #[test]
    fn regen_catchup_is_capped() {
        let t0 = Instant::now();
        let mut p = test_player(1, t0);
        p.health = 50.0;
        let mut w = world_with(p);
        let tuning = Tuning::default();

        // Ten seconds of missed regen must heal at most the catch-up cap.
        let later = t0 + Duration::from_secs(10);
        update_players(&mut w, &tuning, later);
        let p = &w.players[&1];
        assert_eq!(
            p.health,
            50.0 + tuning.player.regen_per_tick * tuning.player.regen_catchup_ticks as f32
        );
        // Backlog is dropped, not deferred.
        assert!(p.last_regen_at + tuning.player.regen_interval > later);
    }

    #[test]
    fn combo_resets_once_and_records_best() {
        let t0 = Instant::now();
        let mut p = test_player(1, t0);
        p.combo = 7;
        p.combo_expires_at = Some(t0 + Duration::from_secs(1));
        let mut w = world_with(p);
        let tuning = Tuning::default();

        let later = t0 + Duration::from_secs(2);
        update_players(&mut w, &tuning, later);
        assert_eq!(w.players[&1].combo, 0);
        assert_eq!(w.players[&1].highest_combo, 7);
        assert!(w.players[&1].combo_expires_at.is_none());

        // A second pass is a no-op.
        w.outbox.clear();
        update_players(&mut w, &tuning, later + Duration::from_secs(1));
        assert!(w.outbox.is_empty());
    }

    #[test]
    fn auto_fire_ignores_input_and_respects_cooldown() {
        let t0 = Instant::now();
        let mut p = test_player(1, t0);
        p.weapons.push(Weapon {
            damage: 10.0,
            cooldown: Duration::from_millis(500),
            last_fired_at: None,
            auto_fire: true,
            projectile_speed: 500.0,
            piercing: 0,
            explosive: None,
            chain_jumps: 0,
            poison: false,
            ice: false,
        });
        let mut w = world_with(p);
        let tuning = Tuning::default();

        update_players(&mut w, &tuning, t0 + Duration::from_millis(1));
        assert_eq!(w.projectiles.len(), 1);

        // Still cooling down.
        update_players(&mut w, &tuning, t0 + Duration::from_millis(100));
        assert_eq!(w.projectiles.len(), 1);

        update_players(&mut w, &tuning, t0 + Duration::from_millis(600));
        assert_eq!(w.projectiles.len(), 2);
    }

    #[test]
    fn invisibility_pickup_grants_stealth() {
        use crate::domain::state::{Pickup, SessionStats};

        struct Sink;
        impl DeathSink for Sink {
            fn record_death(&mut self, _: &Player, _: SessionStats, _: Instant) {}
        }

        let t0 = Instant::now();
        let mut w = world_with(test_player(1, t0));
        let tuning = Tuning::default();
        let mut resolver = CombatResolver::new(Sink, tuning.clone());

        let id = w.alloc_id();
        w.pickups.insert(
            id,
            Pickup {
                id,
                x: 0.0,
                y: 0.0,
                kind: PickupKind::Invisibility(Duration::from_secs(4)),
                expires_at: t0 + Duration::from_secs(20),
            },
        );

        collect_pickups(&mut w, &mut resolver, &tuning, t0);
        assert!(w.pickups.is_empty());
        assert!(w.players[&1].is_invisible(t0 + Duration::from_secs(3)));
        assert!(!w.players[&1].is_invisible(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn movement_slides_along_walls() {
        let t0 = Instant::now();
        let mut p = test_player(1, t0);
        let arena = Arena::default();
        p.x = arena.max_x - 17.0;
        p.y = 0.0;
        p.last_input = PlayerInput {
            move_x: 1.0,
            move_y: 1.0,
            aim: 0.0,
            firing: false,
        };
        let mut w = world_with(p);
        let tuning = Tuning::default();

        update_players(&mut w, &tuning, t0 + Duration::from_millis(16));
        let p = &w.players[&1];
        // Clamped on x, free on y.
        assert!(p.x <= arena.max_x - tuning.player.radius + 0.01);
        assert!(p.y > 0.0);
    }
}
