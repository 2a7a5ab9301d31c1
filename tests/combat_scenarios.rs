// End-to-end combat resolution scenarios against the public crate surface.

use std::time::{Duration, Instant};

use horde_server::domain::ports::DeathSink;
use horde_server::domain::state::{
    AdversaryKind, Arena, CombatSignal, DeltaTime, EntityId, Notification, Owner, Player,
    ProjectileSpec, SessionStats, World,
};
use horde_server::domain::systems::adversaries::{spawn_adversary, update_adversaries};
use horde_server::domain::systems::status_effects;
use horde_server::domain::systems::combat::{CombatResolver, DamageSource};
use horde_server::domain::systems::spatial::SpatialIndex;
use horde_server::domain::tuning::Tuning;
use horde_server::use_cases::game::spawn_player;

#[derive(Default)]
struct CollectSink {
    deaths: Vec<(EntityId, SessionStats)>,
}

impl DeathSink for CollectSink {
    fn record_death(&mut self, player: &Player, stats: SessionStats, _now: Instant) {
        self.deaths.push((player.id, stats));
    }
}

fn setup() -> (World, CombatResolver<CollectSink>, Tuning, Instant) {
    let tuning = Tuning::default();
    let world = World::new(Arena::default(), 7);
    let resolver = CombatResolver::new(CollectSink::default(), tuning.clone());
    (world, resolver, tuning, Instant::now())
}

fn join_player(world: &mut World, tuning: &Tuning, id: EntityId, now: Instant) {
    spawn_player(world, tuning, id, None, format!("p{id}"), now);
    // Combat tests want hits to land immediately.
    if let Some(p) = world.players.get_mut(&id) {
        p.spawn_protection_until = None;
    }
}

fn plain_shot(world: &mut World, owner: EntityId, damage: f32, piercing: u8, now: Instant) -> EntityId {
    world.spawn_projectile(
        ProjectileSpec {
            owner: Owner::Player(owner),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            speed: 600.0,
            radius: 4.0,
            damage,
            piercing,
            explosive: None,
            chain_jumps: 0,
            poison: false,
            ice: false,
            ignore_walls: false,
            lifetime: Duration::from_secs(2),
        },
        now,
    )
}

#[test]
fn piercing_projectile_hits_one_more_target_than_its_rating() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let index = SpatialIndex::new();

    let targets: Vec<EntityId> = (0..3)
        .map(|i| {
            let id = spawn_adversary(
                &mut world,
                AdversaryKind::Brute,
                100.0 + i as f32 * 40.0,
                0.0,
                1,
                &tuning,
                now,
            );
            // Keep them alive through one hit.
            world.adversaries.get_mut(&id).unwrap().health = 1000.0;
            id
        })
        .collect();

    let proj = plain_shot(&mut world, 1, 10.0, 2, now);

    assert!(!resolver.projectile_hit_adversary(&mut world, &index, proj, targets[0], now));
    assert!(!resolver.projectile_hit_adversary(&mut world, &index, proj, targets[1], now));
    assert!(resolver.projectile_hit_adversary(&mut world, &index, proj, targets[2], now));
    assert!(!world.projectiles.contains_key(&proj));
}

#[test]
fn projectile_never_hits_the_same_target_twice() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let index = SpatialIndex::new();

    let target = spawn_adversary(&mut world, AdversaryKind::Brute, 100.0, 0.0, 1, &tuning, now);
    world.adversaries.get_mut(&target).unwrap().health = 1000.0;

    let proj = plain_shot(&mut world, 1, 10.0, 3, now);
    assert!(!resolver.projectile_hit_adversary(&mut world, &index, proj, target, now));
    let after_first = world.adversaries[&target].health;

    assert!(!resolver.projectile_hit_adversary(&mut world, &index, proj, target, now));
    assert_eq!(world.adversaries[&target].health, after_first);
}

#[test]
fn lifesteal_heals_the_attacker_on_hit() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let index = SpatialIndex::new();
    {
        let p = world.players.get_mut(&1).unwrap();
        p.lifesteal = 0.5;
        p.health = 50.0;
    }

    let target = spawn_adversary(&mut world, AdversaryKind::Brute, 100.0, 0.0, 1, &tuning, now);
    world.adversaries.get_mut(&target).unwrap().health = 1000.0;

    let proj = plain_shot(&mut world, 1, 10.0, 0, now);
    resolver.projectile_hit_adversary(&mut world, &index, proj, target, now);

    assert_eq!(world.players[&1].health, 55.0);
}

#[test]
fn thorns_reflects_melee_damage_back_at_the_source() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    world.players.get_mut(&1).unwrap().thorns = 0.5;

    let walker = spawn_adversary(&mut world, AdversaryKind::Walker, 20.0, 0.0, 1, &tuning, now);
    let walker_hp = world.adversaries[&walker].health;

    resolver.damage_player(
        &mut world,
        1,
        10.0,
        DamageSource::Melee { adversary: walker },
        now,
    );
    assert_eq!(world.players[&1].health, 90.0);
    assert_eq!(world.adversaries[&walker].health, walker_hp - 5.0);

    // Ranged damage never triggers thorns.
    resolver.damage_player(&mut world, 1, 10.0, DamageSource::Projectile, now);
    assert_eq!(world.adversaries[&walker].health, walker_hp - 5.0);
}

#[test]
fn spawn_protection_blocks_all_damage() {
    let (mut world, mut resolver, tuning, now) = setup();
    spawn_player(&mut world, &tuning, 1, None, "fresh".to_string(), now);

    resolver.damage_player(&mut world, 1, 9999.0, DamageSource::Projectile, now);
    let p = &world.players[&1];
    assert!(p.alive);
    assert_eq!(p.health, p.max_health);
}

#[test]
fn non_finite_damage_is_a_no_op() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let target = spawn_adversary(&mut world, AdversaryKind::Walker, 20.0, 0.0, 1, &tuning, now);
    let hp = world.adversaries[&target].health;

    resolver.damage_player(&mut world, 1, f32::NAN, DamageSource::Projectile, now);
    resolver.damage_adversary(
        &mut world,
        target,
        f32::INFINITY,
        Some(1),
        None,
        DamageSource::Projectile,
        now,
    );

    assert_eq!(world.players[&1].health, 100.0);
    assert_eq!(world.adversaries[&target].health, hp);
}

#[test]
fn shieldbearer_mitigates_only_frontal_hits() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);

    let id = spawn_adversary(
        &mut world,
        AdversaryKind::Shieldbearer,
        100.0,
        0.0,
        1,
        &tuning,
        now,
    );
    {
        let a = world.adversaries.get_mut(&id).unwrap();
        a.facing = 0.0;
        a.health = 100.0;
        a.max_health = 100.0;
    }

    // Projectile travelling in -x arrives from the front of a defender
    // facing +x.
    resolver.damage_adversary(
        &mut world,
        id,
        10.0,
        Some(1),
        Some(std::f32::consts::PI),
        DamageSource::Projectile,
        now,
    );
    let expected = 100.0 - 10.0 * (1.0 - tuning.adversary.shield_mitigation);
    assert!((world.adversaries[&id].health - expected).abs() < 1e-3);

    // A hit from behind lands in full.
    resolver.damage_adversary(
        &mut world,
        id,
        10.0,
        Some(1),
        Some(0.0),
        DamageSource::Projectile,
        now,
    );
    assert!((world.adversaries[&id].health - (expected - 10.0)).abs() < 1e-3);
}

#[test]
fn kill_credits_combo_score_and_experience() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let target = spawn_adversary(&mut world, AdversaryKind::Walker, 20.0, 0.0, 1, &tuning, now);

    let killed = resolver.damage_adversary(
        &mut world,
        target,
        10_000.0,
        Some(1),
        None,
        DamageSource::Projectile,
        now,
    );
    assert!(killed);
    assert!(!world.adversaries.contains_key(&target));

    let p = &world.players[&1];
    assert_eq!(p.kills, 1);
    assert_eq!(p.combo, 1);
    assert_eq!(p.score, 10);
    assert_eq!(p.experience, 5);

    assert!(world.signals.iter().any(|s| matches!(
        s,
        CombatSignal::AdversaryKilled {
            id,
            by: Some(1),
            was_boss: false,
        } if *id == target
    )));
}

#[test]
fn experience_levels_up_and_raises_max_health() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);

    resolver.award_experience(&mut world, 1, tuning.player.xp_per_level);

    let p = &world.players[&1];
    assert_eq!(p.level, 2);
    assert_eq!(p.experience, 0);
    assert_eq!(p.max_health, 100.0 + tuning.player.max_health_per_level);
    assert!(
        world
            .outbox
            .iter()
            .any(|n| matches!(n, Notification::LevelUp { player_id: 1, level: 2 }))
    );
}

#[test]
fn splitter_death_spawns_reduced_offspring() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let splitter = spawn_adversary(&mut world, AdversaryKind::Splitter, 100.0, 0.0, 1, &tuning, now);
    let max_health = world.adversaries[&splitter].max_health;

    resolver.damage_adversary(
        &mut world,
        splitter,
        10_000.0,
        Some(1),
        None,
        DamageSource::Projectile,
        now,
    );

    let offspring: Vec<_> = world
        .adversaries
        .values()
        .filter(|a| a.kind == AdversaryKind::Splinterling)
        .collect();
    assert_eq!(offspring.len() as u32, tuning.adversary.split_count);
    let expected = max_health * tuning.adversary.split_stat_fraction;
    for s in offspring {
        assert!((s.health - expected).abs() < 1e-3);
    }
}

#[test]
fn player_death_is_recorded_exactly_once() {
    let (mut world, mut resolver, tuning, now) = setup();
    let later = now + Duration::from_secs(90);
    join_player(&mut world, &tuning, 1, now);
    {
        let p = world.players.get_mut(&1).unwrap();
        p.kills = 12;
        p.highest_combo = 4;
    }

    resolver.damage_player(&mut world, 1, 10_000.0, DamageSource::Projectile, later);
    resolver.damage_player(&mut world, 1, 10_000.0, DamageSource::Projectile, later);

    let deaths = &resolver.deaths_mut().deaths;
    assert_eq!(deaths.len(), 1);
    let (id, stats) = &deaths[0];
    assert_eq!(*id, 1);
    assert_eq!(stats.kills, 12);
    assert_eq!(stats.combo_max, 4);
    assert_eq!(stats.survival_time_seconds, 90);

    let p = &world.players[&1];
    assert!(!p.alive);
    assert_eq!(p.health, 0.0);
    assert!(
        world
            .signals
            .iter()
            .any(|s| matches!(s, CombatSignal::PlayerDied { id: 1 }))
    );
}

#[test]
fn boss_phase_tracks_health_and_never_decreases() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);
    let boss = spawn_adversary(
        &mut world,
        AdversaryKind::Boss(horde_server::domain::state::BossKind::Abomination),
        0.0,
        -400.0,
        5,
        &tuning,
        now,
    );
    let max = world.adversaries[&boss].max_health;

    // Drop to 50% of health: one threshold (0.66) crossed.
    resolver.damage_adversary(
        &mut world,
        boss,
        max * 0.5,
        Some(1),
        None,
        DamageSource::Projectile,
        now,
    );
    assert_eq!(world.adversaries[&boss].boss_phase, 1);

    // Phase stays put even if health is topped back up.
    world.adversaries.get_mut(&boss).unwrap().health = max;
    resolver.damage_adversary(
        &mut world,
        boss,
        1.0,
        Some(1),
        None,
        DamageSource::Projectile,
        now,
    );
    assert_eq!(world.adversaries[&boss].boss_phase, 1);
}

#[test]
fn frozen_adversary_stands_still_until_thaw() {
    let mut tuning = Tuning::default();
    // Make the freeze rider deterministic for the scenario.
    tuning.projectile.ice_freeze_chance = 1.0;
    let mut world = World::new(Arena::default(), 7);
    world.delta = DeltaTime {
        seconds: 1.0 / 60.0,
        multiplier: 1.0,
    };
    let mut resolver = CombatResolver::new(CollectSink::default(), tuning.clone());
    let now = Instant::now();
    join_player(&mut world, &tuning, 1, now);
    let index = SpatialIndex::new();

    let target = spawn_adversary(&mut world, AdversaryKind::Walker, 100.0, 0.0, 1, &tuning, now);
    world.adversaries.get_mut(&target).unwrap().health = 1000.0;
    let base_speed = world.adversaries[&target].base_speed;

    let proj = world.spawn_projectile(
        ProjectileSpec {
            owner: Owner::Player(1),
            x: 90.0,
            y: 0.0,
            angle: 0.0,
            speed: 600.0,
            radius: 4.0,
            damage: 10.0,
            piercing: 0,
            explosive: None,
            chain_jumps: 0,
            poison: false,
            ice: true,
            ignore_walls: false,
            lifetime: Duration::from_secs(2),
        },
        now,
    );
    resolver.projectile_hit_adversary(&mut world, &index, proj, target, now);

    // Frozen solid: speed is zeroed and the adversary phase moves it nowhere.
    assert_eq!(world.adversaries[&target].speed, 0.0);
    update_adversaries(&mut world, &mut resolver, &tuning, now);
    assert_eq!(world.adversaries[&target].x, 100.0);

    // On thaw the concurrent ice slow takes over, and movement resumes.
    let thaw = now + tuning.projectile.ice_freeze_duration;
    status_effects::resolve(&mut world, &mut resolver, thaw);
    let speed = world.adversaries[&target].speed;
    assert!(speed > 0.0);
    assert!((speed - base_speed * tuning.projectile.ice_slow_factor).abs() < 1e-3);

    update_adversaries(&mut world, &mut resolver, &tuning, thaw);
    assert!(world.adversaries[&target].x < 100.0);
}

#[test]
fn explosive_projectile_splashes_nearby_adversaries() {
    let (mut world, mut resolver, tuning, now) = setup();
    join_player(&mut world, &tuning, 1, now);

    let primary = spawn_adversary(&mut world, AdversaryKind::Brute, 100.0, 0.0, 1, &tuning, now);
    let nearby = spawn_adversary(&mut world, AdversaryKind::Brute, 130.0, 0.0, 1, &tuning, now);
    let far = spawn_adversary(&mut world, AdversaryKind::Brute, 600.0, 0.0, 1, &tuning, now);
    for id in [primary, nearby, far] {
        world.adversaries.get_mut(&id).unwrap().health = 1000.0;
    }

    let mut index = SpatialIndex::new();
    index.rebuild(&world, now);

    let proj = world.spawn_projectile(
        ProjectileSpec {
            owner: Owner::Player(1),
            x: 90.0,
            y: 0.0,
            angle: 0.0,
            speed: 600.0,
            radius: 4.0,
            damage: 20.0,
            piercing: 0,
            explosive: Some(horde_server::domain::state::ExplosiveSpec {
                radius: 80.0,
                percent: 0.5,
            }),
            chain_jumps: 0,
            poison: false,
            ice: false,
            ignore_walls: false,
            lifetime: Duration::from_secs(2),
        },
        now,
    );

    resolver.projectile_hit_adversary(&mut world, &index, proj, primary, now);

    assert_eq!(world.adversaries[&primary].health, 980.0);
    assert_eq!(world.adversaries[&nearby].health, 990.0);
    assert_eq!(world.adversaries[&far].health, 1000.0);
}
