// Tick orchestration: delta clamping, the re-entrancy guard with its stuck
// watchdog, the fixed phase order, and panic isolation. The world task calls
// `tick` at the configured rate and publishes snapshots from the result.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::domain::ports::DeathSink;
use crate::domain::state::{DeltaTime, World};
use crate::domain::systems::spatial::SpatialIndex;
use crate::domain::systems::{
    adversaries, cleanup, combat::CombatResolver, hazards, players, projectiles, status_effects,
    waves,
};
use crate::domain::tuning::Tuning;

/// Periodic upkeep the scheduler drives on a low cadence; satisfied by
/// `DeathPersistence` in production and by stubs in tests.
pub trait RecoverySweep {
    fn sweep(&mut self, now: Instant);
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub target_interval: Duration,
    /// Upper bound on catch-up after a stall, in target-interval frames.
    /// Distinct from the regeneration catch-up cap in `PlayerTuning`.
    pub max_delta_frames: f32,
    /// Guard held longer than this is treated as a crashed tick.
    pub stuck_timeout: Duration,
    pub sweep_interval: Duration,
    pub purge_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_interval: Duration::from_micros(16_667),
            max_delta_frames: 3.0,
            stuck_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(5),
            purge_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TickMetrics {
    pub ticks: u64,
    pub skipped: u64,
    pub caught_panics: u64,
    pub recovered_faults: u64,
    pub last_frame: Duration,
    pub peak_frame: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// Dropped because another invocation holds the guard; never queued.
    Skipped,
    /// The tick body panicked; state may be mid-phase but the guard is clear.
    Faulted,
}

const METRICS_LOG_EVERY: u64 = 600;

pub struct TickScheduler<D: DeathSink + RecoverySweep> {
    world: World,
    resolver: CombatResolver<D>,
    index: SpatialIndex,
    tuning: Tuning,
    config: SchedulerConfig,
    metrics: TickMetrics,
    last_tick: Option<Instant>,
    guard_entered: Option<Instant>,
    last_sweep: Option<Instant>,
    last_purge: Option<Instant>,
}

impl<D: DeathSink + RecoverySweep> TickScheduler<D> {
    pub fn new(world: World, deaths: D, tuning: Tuning, config: SchedulerConfig) -> Self {
        Self {
            world,
            resolver: CombatResolver::new(deaths, tuning.clone()),
            index: SpatialIndex::new(),
            tuning,
            config,
            metrics: TickMetrics::default(),
            last_tick: None,
            guard_entered: None,
            last_sweep: None,
            last_purge: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn metrics(&self) -> TickMetrics {
        self.metrics
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(entered) = self.guard_entered {
            if now.saturating_duration_since(entered) < self.config.stuck_timeout {
                self.metrics.skipped += 1;
                warn!(tick = self.world.tick, "tick overlap, invocation skipped");
                return TickOutcome::Skipped;
            }
            // A guard this old means the owning invocation never released
            // it. Force-clear and let this tick proceed.
            self.metrics.recovered_faults += 1;
            error!(
                tick = self.world.tick,
                held_for = ?now.saturating_duration_since(entered),
                "tick guard stuck, force-clearing"
            );
        }
        self.guard_entered = Some(now);

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_phases(now)));

        // Frame metrics and guard release run regardless of the outcome.
        let frame = started.elapsed();
        self.metrics.last_frame = frame;
        self.metrics.peak_frame = self.metrics.peak_frame.max(frame);
        self.guard_entered = None;

        match result {
            Ok(()) => {
                self.metrics.ticks += 1;
                TickOutcome::Completed
            }
            Err(payload) => {
                self.metrics.caught_panics += 1;
                let message = panic_message(&payload);
                error!(tick = self.world.tick, message, "tick body panicked");
                TickOutcome::Faulted
            }
        }
    }

    fn run_phases(&mut self, now: Instant) {
        self.advance_clock(now);
        let world = &mut self.world;

        if world.tick % METRICS_LOG_EVERY == 0 {
            let pop = world.population();
            info!(
                tick = world.tick,
                wave = world.waves.wave,
                players = pop.players,
                adversaries = pop.adversaries,
                projectiles = pop.projectiles,
                skipped = self.metrics.skipped,
                panics = self.metrics.caught_panics,
                recovered = self.metrics.recovered_faults,
                peak_frame = ?self.metrics.peak_frame,
                "tick metrics"
            );
        }

        players::update_players(world, &self.tuning, now);
        adversaries::update_adversaries(world, &mut self.resolver, &self.tuning, now);
        self.index.rebuild(world, now);
        hazards::update_hazards(world, &mut self.resolver, &self.index, &self.tuning, now);
        status_effects::resolve(world, &mut self.resolver, now);
        projectiles::update_projectiles(world, &mut self.resolver, &self.index, &self.tuning, now);
        cleanup::integrate_particles(world);
        cleanup::cleanup_expired(world, now);
        players::collect_pickups(world, &mut self.resolver, &self.tuning, now);
        waves::drive(world, &self.tuning, now);

        if self
            .last_purge
            .is_none_or(|t| now.saturating_duration_since(t) >= self.config.purge_interval)
        {
            self.last_purge = Some(now);
            cleanup::purge_attribution(world);
        }

        if self
            .last_sweep
            .is_none_or(|t| now.saturating_duration_since(t) >= self.config.sweep_interval)
        {
            self.last_sweep = Some(now);
            self.resolver.deaths_mut().sweep(now);
        }
    }

    /// Clamp elapsed time and derive the frame multiplier all motion and
    /// regeneration scale by.
    fn advance_clock(&mut self, now: Instant) {
        let target = self.config.target_interval;
        let elapsed = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => target,
        };
        self.last_tick = Some(now);

        let max = target.mul_f32(self.config.max_delta_frames);
        let clamped = elapsed.min(max);
        self.world.delta = DeltaTime {
            seconds: clamped.as_secs_f32(),
            multiplier: clamped.as_secs_f32() / target.as_secs_f32(),
        };
        self.world.tick += 1;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{Arena, Player, SessionStats};
    use std::time::Duration;

    #[derive(Default)]
    struct NullSink {
        deaths: u32,
        sweeps: u32,
    }

    impl DeathSink for NullSink {
        fn record_death(&mut self, _player: &Player, _stats: SessionStats, _now: Instant) {
            self.deaths += 1;
        }
    }

    impl RecoverySweep for NullSink {
        fn sweep(&mut self, _now: Instant) {
            self.sweeps += 1;
        }
    }

    fn scheduler() -> TickScheduler<NullSink> {
        TickScheduler::new(
            World::new(Arena::default(), 42),
            NullSink::default(),
            Tuning::default(),
            SchedulerConfig::default(),
        )
    }

    #[test]
    fn delta_clamps_at_three_frames() {
        let mut s = scheduler();
        let t0 = Instant::now();
        assert_eq!(s.tick(t0), TickOutcome::Completed);

        // A 500 ms stall is clamped to exactly three target frames.
        assert_eq!(s.tick(t0 + Duration::from_millis(500)), TickOutcome::Completed);
        let delta = s.world().delta;
        assert!((delta.multiplier - 3.0).abs() < 1e-3);
        let target = s.config.target_interval.as_secs_f32();
        assert!((delta.seconds - target * 3.0).abs() < 1e-4);
    }

    #[test]
    fn normal_cadence_is_not_clamped() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.tick(t0);
        s.tick(t0 + s.config.target_interval);
        assert!((s.world().delta.multiplier - 1.0).abs() < 0.01);
    }

    #[test]
    fn overlapping_invocation_is_skipped_not_queued() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.guard_entered = Some(t0);

        assert_eq!(s.tick(t0 + Duration::from_millis(1)), TickOutcome::Skipped);
        assert_eq!(s.metrics.skipped, 1);
        assert_eq!(s.metrics.ticks, 0);
    }

    #[test]
    fn stuck_guard_is_force_cleared_and_tick_proceeds() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.guard_entered = Some(t0);

        let later = t0 + s.config.stuck_timeout + Duration::from_millis(1);
        assert_eq!(s.tick(later), TickOutcome::Completed);
        assert_eq!(s.metrics.recovered_faults, 1);
        assert!(s.guard_entered.is_none());

        // The next tick is accepted normally.
        assert_eq!(
            s.tick(later + s.config.target_interval),
            TickOutcome::Completed
        );
        assert_eq!(s.metrics.ticks, 2);
    }

    #[test]
    fn sweep_runs_on_its_own_cadence() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.tick(t0);
        assert_eq!(s.resolver.deaths_mut().sweeps, 1);

        // Within the interval, no further sweep.
        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.resolver.deaths_mut().sweeps, 1);

        s.tick(t0 + Duration::from_secs(6));
        assert_eq!(s.resolver.deaths_mut().sweeps, 2);
    }
}
