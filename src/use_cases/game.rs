// The world task: owns the scheduler (and through it the world), drains
// player events between ticks, and publishes snapshots and notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::info;

use super::scheduler::{RecoverySweep, TickScheduler};
use super::types::{GameEvent, ServerState, WorldUpdate};
use crate::domain::ports::DeathSink;
use crate::domain::state::{
    EntityId, Notification, Player, PlayerInput, Weapon, World,
};
use crate::domain::tuning::Tuning;

pub async fn world_task<D: DeathSink + RecoverySweep>(
    mut scheduler: TickScheduler<D>,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    notice_tx: broadcast::Sender<Notification>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: Arc<tokio::sync::Notify>,
) {
    let _ = server_state_tx.send(ServerState::Running);

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(ev) = input_rx.try_recv() {
            apply_event(&mut scheduler, ev);
        }

        scheduler.tick(Instant::now());

        let world = scheduler.world_mut();
        for n in world.outbox.drain(..) {
            let _ = notice_tx.send(n);
        }
        let _ = world_tx.send(snapshot(world));
    }

    let _ = server_state_tx.send(ServerState::ShuttingDown);
}

fn apply_event<D: DeathSink + RecoverySweep>(scheduler: &mut TickScheduler<D>, ev: GameEvent) {
    match ev {
        GameEvent::Join {
            player_id,
            account_id,
            display_name,
        } => {
            info!(player_id, name = %display_name, "player joined");
            let tuning = scheduler.tuning().clone();
            spawn_player(
                scheduler.world_mut(),
                &tuning,
                player_id,
                account_id,
                display_name,
                Instant::now(),
            );
        }
        GameEvent::Leave { player_id } => {
            info!(player_id, "player left");
            scheduler.world_mut().players.remove(&player_id);
        }
        GameEvent::Input { player_id, input } => {
            if let Some(p) = scheduler.world_mut().players.get_mut(&player_id) {
                p.last_input = input;
            }
        }
    }
}

/// Place a fresh player near the arena center with spawn protection and
/// the starter weapon.
pub fn spawn_player(
    world: &mut World,
    tuning: &Tuning,
    player_id: EntityId,
    account_id: Option<String>,
    display_name: String,
    now: Instant,
) {
    let pt = tuning.player;
    let (cx, cy) = world.arena.center();
    let x = cx + world.rng.gen_range(-80.0..80.0);
    let y = cy + world.rng.gen_range(-80.0..80.0);

    world.players.insert(
        player_id,
        Player {
            id: player_id,
            account_id,
            display_name,
            x,
            y,
            aim: 0.0,
            health: pt.max_health,
            max_health: pt.max_health,
            alive: true,
            combo: 0,
            combo_expires_at: None,
            highest_combo: 0,
            level: 1,
            experience: 0,
            score: 0,
            gold: 0,
            kills: 0,
            boss_kills: 0,
            joined_at: now,
            speed_boost_until: None,
            weapon_boost_until: None,
            spawn_protection_until: Some(now + pt.spawn_protection),
            invisible_until: None,
            last_regen_at: now,
            weapons: vec![starter_weapon(tuning)],
            thorns: 0.0,
            lifesteal: 0.0,
            contact_damage_at: HashMap::new(),
            trail_damage_at: HashMap::new(),
            last_input: PlayerInput::default(),
        },
    );
}

fn starter_weapon(tuning: &Tuning) -> Weapon {
    Weapon {
        damage: 12.0,
        cooldown: Duration::from_millis(350),
        last_fired_at: None,
        auto_fire: true,
        projectile_speed: tuning.projectile.speed,
        piercing: 0,
        explosive: None,
        chain_jumps: 0,
        poison: false,
        ice: false,
    }
}

fn snapshot(world: &World) -> WorldUpdate {
    WorldUpdate {
        tick: world.tick,
        wave: world.waves.wave,
        players: world
            .players
            .values()
            .filter(|p| p.alive)
            .map(Into::into)
            .collect(),
        adversaries: world.adversaries.values().map(Into::into).collect(),
        projectiles: world.projectiles.values().map(Into::into).collect(),
        pickups: world.pickups.values().map(Into::into).collect(),
    }
}
