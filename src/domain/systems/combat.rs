// Combat resolution: damage, mitigation, life-steal, thorns, and the four
// mutually exclusive kill paths.
//
// The resolver owns the death-progression contract (injected at
// construction) and never touches persistence directly beyond it. Wave
// progression only ever hears about kills through `World::signals`.

use std::time::Instant;

use rand::Rng;
use tracing::{info, warn};

use crate::domain::ports::DeathSink;
use crate::domain::state::{
    AbilityState, AdversaryKind, CombatSignal, Corpse, EntityId, Notification, Owner, Pickup,
    PickupKind, SessionStats, World,
};
use crate::domain::systems::adversaries::spawn_adversary;
use crate::domain::systems::spatial::SpatialIndex;
use crate::domain::systems::status_effects;
use crate::domain::tuning::{Tuning, boss};

const HIT_PARTICLES: u32 = 4;
const KILL_PARTICLES: u32 = 10;
const PARTICLE_BLOOD: u32 = 0x_8f_1d_1d;
const PARTICLE_GORE: u32 = 0x_5a_0f_0f;

/// What dealt the damage; drives mitigation, thorns, and attribution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    Projectile,
    Explosion,
    ChainLightning,
    Poison,
    Thorns,
    Melee { adversary: EntityId },
    Hazard,
    ToxicPool,
    Trail,
    GroundSlam,
}

impl DamageSource {
    fn is_melee(self) -> bool {
        matches!(self, DamageSource::Melee { .. })
    }
}

pub struct CombatResolver<D: DeathSink> {
    deaths: D,
    tuning: Tuning,
}

impl<D: DeathSink> CombatResolver<D> {
    pub fn new(deaths: D, tuning: Tuning) -> Self {
        Self { deaths, tuning }
    }

    /// The injected death-progression dependency, for the scheduler's
    /// periodic retry sweep.
    pub fn deaths_mut(&mut self) -> &mut D {
        &mut self.deaths
    }

    /// Resolve a projectile overlapping an adversary. Returns true when the
    /// projectile is spent and must be destroyed.
    pub fn projectile_hit_adversary(
        &mut self,
        world: &mut World,
        index: &SpatialIndex,
        projectile_id: EntityId,
        target_id: EntityId,
        now: Instant,
    ) -> bool {
        let Some(mut proj) = world.projectiles.remove(&projectile_id) else {
            return true;
        };
        if proj.pierced.contains(&target_id) || !world.adversaries.contains_key(&target_id) {
            world.projectiles.insert(projectile_id, proj);
            return false;
        }
        proj.pierced.push(target_id);

        let attacker = match proj.owner {
            Owner::Player(id) => Some(id),
            Owner::Adversary => None,
        };
        let hit_angle = proj.vy.atan2(proj.vx);
        let (impact_x, impact_y) = {
            let a = &world.adversaries[&target_id];
            (a.x, a.y)
        };

        // On-hit status effects come from immutable projectile flags.
        let freeze_roll: f32 = world.rng.r#gen();
        if let Some(target) = world.adversaries.get_mut(&target_id) {
            let pt = &self.tuning.projectile;
            if proj.poison {
                status_effects::apply_poison(
                    target,
                    pt.poison_damage_per_tick,
                    pt.poison_duration,
                    pt.poison_tick_interval,
                    attacker,
                    now,
                );
            }
            if proj.ice {
                status_effects::apply_slow(target, pt.ice_slow_factor, pt.ice_slow_duration, now);
                if freeze_roll < pt.ice_freeze_chance {
                    status_effects::apply_freeze(target, pt.ice_freeze_duration, now);
                }
            }
        }

        // Life-steal before the target can die and drop its borrow.
        if let Some(player_id) = attacker
            && let Some(p) = world.players.get_mut(&player_id)
            && p.lifesteal > 0.0
        {
            p.health = (p.health + proj.damage * p.lifesteal).min(p.max_health);
        }

        self.damage_adversary(
            world,
            target_id,
            proj.damage,
            attacker,
            Some(hit_angle),
            DamageSource::Projectile,
            now,
        );
        world.spawn_particles(impact_x, impact_y, PARTICLE_BLOOD, HIT_PARTICLES, now);

        if let Some(blast) = proj.explosive {
            let secondary = proj.damage * blast.percent;
            for id in index.adversaries_in_radius(impact_x, impact_y, blast.radius, Some(target_id))
            {
                if proj.pierced.contains(&id) {
                    continue;
                }
                self.damage_adversary(
                    world,
                    id,
                    secondary,
                    attacker,
                    None,
                    DamageSource::Explosion,
                    now,
                );
            }
        }

        if proj.chain_jumps > 0 {
            self.chain_lightning(world, index, &mut proj, impact_x, impact_y, attacker, now);
        }

        let spent = proj.pierced.len() > proj.piercing as usize;
        if !spent {
            world.projectiles.insert(projectile_id, proj);
        }
        spent
    }

    /// Resolve an adversary projectile overlapping a player. Adversary
    /// projectiles never pierce.
    pub fn projectile_hit_player(
        &mut self,
        world: &mut World,
        projectile_id: EntityId,
        player_id: EntityId,
        now: Instant,
    ) -> bool {
        let Some(proj) = world.projectiles.remove(&projectile_id) else {
            return true;
        };
        self.damage_player(world, player_id, proj.damage, DamageSource::Projectile, now);
        world.spawn_particles(proj.x, proj.y, PARTICLE_BLOOD, HIT_PARTICLES, now);
        true
    }

    fn chain_lightning(
        &mut self,
        world: &mut World,
        index: &SpatialIndex,
        proj: &mut crate::domain::state::Projectile,
        from_x: f32,
        from_y: f32,
        attacker: Option<EntityId>,
        now: Instant,
    ) {
        let pt = self.tuning.projectile;
        let mut jumps = proj.chain_jumps;
        let mut damage = proj.damage * pt.chain_falloff;
        let (mut x, mut y) = (from_x, from_y);

        while jumps > 0 {
            let next = index
                .adversaries_in_radius(x, y, pt.chain_radius, None)
                .into_iter()
                .filter(|id| !proj.pierced.contains(id) && !proj.chained.contains(id))
                .filter_map(|id| {
                    let a = world.adversaries.get(&id)?;
                    let dx = a.x - x;
                    let dy = a.y - y;
                    Some((id, a.x, a.y, dx * dx + dy * dy))
                })
                .min_by(|a, b| a.3.total_cmp(&b.3));
            let Some((id, ax, ay, _)) = next else {
                break;
            };
            proj.chained.push(id);
            self.damage_adversary(
                world,
                id,
                damage,
                attacker,
                None,
                DamageSource::ChainLightning,
                now,
            );
            (x, y) = (ax, ay);
            damage *= pt.chain_falloff;
            jumps -= 1;
        }
    }

    /// Apply damage to an adversary after mitigation. Returns true when the
    /// hit killed it.
    #[allow(clippy::too_many_arguments)]
    pub fn damage_adversary(
        &mut self,
        world: &mut World,
        adversary_id: EntityId,
        damage: f32,
        attacker: Option<EntityId>,
        hit_angle: Option<f32>,
        source: DamageSource,
        now: Instant,
    ) -> bool {
        let Some(a) = world.adversaries.get_mut(&adversary_id) else {
            return false;
        };
        // An invalid number is a no-op for this one interaction; prior valid
        // state stays untouched.
        if !damage.is_finite() || !a.health.is_finite() {
            warn!(
                adversary_id,
                damage,
                health = a.health,
                source = ?source,
                "non-finite combat value; hit ignored"
            );
            return false;
        }

        let mut applied = damage;

        // Directional shield: mitigate hits landing inside the frontal arc.
        if a.kind == AdversaryKind::Shieldbearer
            && let Some(angle) = hit_angle
        {
            let at = &self.tuning.adversary;
            // Angle the hit arrives from, seen from the defender.
            let incoming = angle + std::f32::consts::PI;
            let diff = angle_diff(incoming, a.facing).abs();
            if diff <= at.shield_arc {
                applied *= 1.0 - at.shield_mitigation;
            }
        }

        // Boss shield while active.
        if let (AdversaryKind::Boss(kind), AbilityState::Boss(state)) = (a.kind, &a.ability)
            && state.shield_until.is_some_and(|t| now < t)
        {
            applied *= 1.0 - boss::spec(kind).shield_mitigation;
        }

        a.health -= applied;

        // Boss phase is a pure function of health fraction and only climbs.
        if let AdversaryKind::Boss(kind) = a.kind {
            let fraction = (a.health / a.max_health).max(0.0);
            a.boss_phase = a.boss_phase.max(boss::spec(kind).phase_for_fraction(fraction));
        }

        if a.health <= 0.0 {
            self.kill_adversary(world, adversary_id, attacker, now);
            return true;
        }
        false
    }

    /// Exactly one destruction path per adversary lifetime.
    fn kill_adversary(
        &mut self,
        world: &mut World,
        adversary_id: EntityId,
        attacker: Option<EntityId>,
        now: Instant,
    ) {
        let Some(a) = world.adversaries.remove(&adversary_id) else {
            return;
        };
        world.spawn_particles(a.x, a.y, PARTICLE_GORE, KILL_PARTICLES, now);

        let was_boss = a.kind.is_boss();
        let is_clone = a.despawn_at.is_some();

        if let Some(player_id) = attacker {
            self.credit_kill(world, player_id, was_boss, now);
        }

        if is_clone {
            // Clone kills grant nothing and never feed the wave counters;
            // the timed path in cleanup is the usual way out.
            return;
        }

        match a.kind {
            AdversaryKind::Boss(kind) => {
                info!(adversary_id, boss = boss::spec(kind).name, "boss destroyed");
                self.drop_loot(world, a.x, a.y, true, now);
            }
            AdversaryKind::Splitter => {
                let at = self.tuning.adversary;
                for i in 0..at.split_count {
                    let angle = std::f32::consts::TAU * (i as f32) / (at.split_count as f32);
                    let x = a.x + angle.cos() * a.size;
                    let y = a.y + angle.sin() * a.size;
                    let id = spawn_adversary(
                        world,
                        AdversaryKind::Splinterling,
                        x,
                        y,
                        world.waves.wave,
                        &self.tuning,
                        now,
                    );
                    if let Some(s) = world.adversaries.get_mut(&id) {
                        s.health = a.max_health * at.split_stat_fraction;
                        s.max_health = s.health;
                        s.contact_damage = a.contact_damage * at.split_stat_fraction;
                    }
                }
                self.area_hit_players(world, a.x, a.y, at.split_blast_radius, at.split_blast_damage, now);
            }
            AdversaryKind::Bomber => {
                let at = self.tuning.adversary;
                self.area_hit_players(world, a.x, a.y, at.bomber_blast_radius, at.bomber_blast_damage, now);
                world.spawn_particles(a.x, a.y, PARTICLE_GORE, KILL_PARTICLES, now);
            }
            _ => {
                self.drop_loot(world, a.x, a.y, false, now);
                world.corpses.push(Corpse {
                    x: a.x,
                    y: a.y,
                    kind: a.kind,
                    expires_at: now + self.tuning.adversary.corpse_lifetime,
                });
            }
        }

        world.signals.push(CombatSignal::AdversaryKilled {
            id: adversary_id,
            by: attacker,
            was_boss,
        });
    }

    fn area_hit_players(
        &mut self,
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
        for id in hit {
            self.damage_player(world, id, damage, DamageSource::Explosion, now);
        }
    }

    fn credit_kill(&mut self, world: &mut World, player_id: EntityId, was_boss: bool, now: Instant) {
        let pt = self.tuning.player;
        let Some(p) = world.players.get_mut(&player_id) else {
            return;
        };
        p.kills += 1;
        if was_boss {
            p.boss_kills += 1;
        }
        p.combo += 1;
        p.combo_expires_at = Some(now + pt.combo_timeout);
        p.highest_combo = p.highest_combo.max(p.combo);
        let combo = p.combo;
        p.score += 10 * combo as u64 * if was_boss { 10 } else { 1 };
        world.notify(Notification::ComboUpdate { player_id, combo });

        let xp = if was_boss { 50 } else { 5 };
        self.award_experience(world, player_id, xp);
    }

    pub fn award_experience(&mut self, world: &mut World, player_id: EntityId, xp: u64) {
        let pt = self.tuning.player;
        let Some(p) = world.players.get_mut(&player_id) else {
            return;
        };
        p.experience += xp;
        let mut leveled = None;
        while p.experience >= p.level as u64 * pt.xp_per_level {
            p.experience -= p.level as u64 * pt.xp_per_level;
            p.level += 1;
            p.max_health += pt.max_health_per_level;
            p.health = (p.health + pt.max_health_per_level * 2.0).min(p.max_health);
            leveled = Some(p.level);
        }
        if let Some(level) = leveled {
            world.notify(Notification::LevelUp { player_id, level });
        }
    }

    fn drop_loot(&mut self, world: &mut World, x: f32, y: f32, boss: bool, now: Instant) {
        let drops = if boss {
            3
        } else if world.rng.gen_bool(0.3) {
            1
        } else {
            0
        };
        for i in 0..drops {
            let roll: f32 = world.rng.r#gen();
            let kind = match roll {
                r if r < 0.4 => PickupKind::Gold(if boss { 50 } else { 5 }),
                r if r < 0.7 => PickupKind::Experience(if boss { 40 } else { 10 }),
                r if r < 0.85 => PickupKind::Heal(15.0),
                r if r < 0.91 => PickupKind::SpeedBoost(std::time::Duration::from_secs(6)),
                r if r < 0.97 => PickupKind::WeaponBoost(std::time::Duration::from_secs(8)),
                _ => PickupKind::Invisibility(std::time::Duration::from_secs(4)),
            };
            let id = world.alloc_id();
            world.pickups.insert(
                id,
                Pickup {
                    id,
                    x: x + (i as f32) * 10.0,
                    y,
                    kind,
                    expires_at: now + std::time::Duration::from_secs(20),
                },
            );
        }
    }

    /// Apply damage to a player. Spawn protection blocks it entirely; thorns
    /// reflects a fraction of melee damage back at the source.
    pub fn damage_player(
        &mut self,
        world: &mut World,
        player_id: EntityId,
        damage: f32,
        source: DamageSource,
        now: Instant,
    ) {
        if !damage.is_finite() {
            warn!(player_id, damage, "non-finite damage; hit ignored");
            return;
        }
        let thorns_reflect = {
            let Some(p) = world.players.get_mut(&player_id) else {
                return;
            };
            if !p.alive || p.is_protected(now) || !p.health.is_finite() {
                return;
            }
            p.health -= damage;
            if source.is_melee() && p.thorns > 0.0 {
                Some(damage * p.thorns)
            } else {
                None
            }
        };

        if let (Some(reflect), DamageSource::Melee { adversary }) = (thorns_reflect, source) {
            // Thorns damage is credited to the defender.
            self.damage_adversary(
                world,
                adversary,
                reflect,
                Some(player_id),
                None,
                DamageSource::Thorns,
                now,
            );
        }

        let dead = world
            .players
            .get(&player_id)
            .is_some_and(|p| p.alive && p.health <= 0.0);
        if dead {
            self.on_player_death(world, player_id, now);
        }
    }

    fn on_player_death(&mut self, world: &mut World, player_id: EntityId, now: Instant) {
        let wave = world.waves.wave;
        let Some(p) = world.players.get_mut(&player_id) else {
            return;
        };
        p.alive = false;
        p.health = 0.0;
        let stats = SessionStats {
            wave,
            level: p.level,
            kills: p.kills,
            survival_time_seconds: p.survival_time(now).as_secs(),
            combo_max: p.highest_combo.max(p.combo),
            boss_kills: p.boss_kills,
        };
        info!(
            player_id,
            wave = stats.wave,
            kills = stats.kills,
            survival_s = stats.survival_time_seconds,
            "player died"
        );
        let (x, y) = (p.x, p.y);
        // Delegated; the resolver never talks to storage itself.
        self.deaths.record_death(p, stats, now);
        world.signals.push(CombatSignal::PlayerDied { id: player_id });
        world.spawn_particles(x, y, PARTICLE_BLOOD, KILL_PARTICLES, now);
    }
}

fn angle_diff(a: f32, b: f32) -> f32 {
    let mut d = (a - b) % std::f32::consts::TAU;
    if d > std::f32::consts::PI {
        d -= std::f32::consts::TAU;
    } else if d < -std::f32::consts::PI {
        d += std::f32::consts::TAU;
    }
    d
}
