// Status-effect application and per-tick resolution for adversaries.
//
// All expirations are absolute-timestamp comparisons evaluated every tick;
// nothing here schedules callbacks. Freeze and slow snapshot the speed they
// displaced and restore it on expiry, so stacking never compounds.

use std::time::{Duration, Instant};

use crate::domain::ports::DeathSink;
use crate::domain::state::{
    Adversary, EntityId, FreezeEffect, PoisonEffect, SlowEffect, World,
};
use crate::domain::systems::combat::{CombatResolver, DamageSource};

pub fn apply_poison(
    adversary: &mut Adversary,
    damage_per_tick: f32,
    duration: Duration,
    tick_interval: Duration,
    source: Option<EntityId>,
    now: Instant,
) {
    match &mut adversary.effects.poisoned {
        // Reapplication refreshes the clock but keeps the tick cadence.
        Some(poison) => {
            poison.until = now + duration;
            poison.damage_per_tick = poison.damage_per_tick.max(damage_per_tick);
            poison.source = source.or(poison.source);
        }
        None => {
            adversary.effects.poisoned = Some(PoisonEffect {
                until: now + duration,
                damage_per_tick,
                tick_interval,
                next_tick_at: now + tick_interval,
                source,
            });
        }
    }
}

pub fn apply_freeze(adversary: &mut Adversary, duration: Duration, now: Instant) {
    match &mut adversary.effects.frozen {
        Some(freeze) => freeze.until = now + duration,
        None => {
            // A concurrent slow already holds the true speed.
            let original = adversary
                .effects
                .slowed
                .map(|s| s.original_speed)
                .unwrap_or(adversary.speed);
            adversary.effects.frozen = Some(FreezeEffect {
                until: now + duration,
                original_speed: original,
            });
            adversary.speed = 0.0;
        }
    }
}

pub fn apply_slow(adversary: &mut Adversary, factor: f32, duration: Duration, now: Instant) {
    match &mut adversary.effects.slowed {
        Some(slow) => {
            slow.until = now + duration;
            slow.factor = slow.factor.min(factor);
        }
        None => {
            let original = adversary
                .effects
                .frozen
                .map(|f| f.original_speed)
                .unwrap_or(adversary.speed);
            adversary.effects.slowed = Some(SlowEffect {
                until: now + duration,
                factor,
                original_speed: original,
            });
        }
    }
    // Frozen wins while active; the slow takes over on thaw.
    if adversary.effects.frozen.is_none()
        && let Some(slow) = adversary.effects.slowed
    {
        adversary.speed = slow.original_speed * slow.factor;
    }
}

/// Expire effects and apply pending poison ticks for every adversary.
/// Poison deaths route through the resolver's ordinary kill paths.
pub fn resolve<D: DeathSink>(world: &mut World, resolver: &mut CombatResolver<D>, now: Instant) {
    let ids: Vec<EntityId> = world.adversaries.keys().copied().collect();
    let mut poison_hits: Vec<(EntityId, f32, Option<EntityId>)> = Vec::new();

    for id in ids {
        let Some(a) = world.adversaries.get_mut(&id) else {
            continue;
        };

        if let Some(freeze) = a.effects.frozen
            && now >= freeze.until
        {
            a.effects.frozen = None;
            a.speed = match a.effects.slowed {
                Some(slow) if now < slow.until => slow.original_speed * slow.factor,
                _ => freeze.original_speed,
            };
        }

        if let Some(slow) = a.effects.slowed
            && now >= slow.until
        {
            a.effects.slowed = None;
            if a.effects.frozen.is_none() {
                a.speed = slow.original_speed;
            }
        }

        if let Some(poison) = &mut a.effects.poisoned {
            let mut damage = 0.0;
            while poison.next_tick_at <= now && poison.next_tick_at <= poison.until {
                damage += poison.damage_per_tick;
                poison.next_tick_at += poison.tick_interval;
            }
            let source = poison.source;
            if now >= poison.until {
                a.effects.poisoned = None;
            }
            if damage > 0.0 {
                poison_hits.push((id, damage, source));
            }
        }
    }

    for (id, damage, source) in poison_hits {
        resolver.damage_adversary(world, id, damage, source, None, DamageSource::Poison, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{AbilityState, AdversaryKind, EffectState};

    fn walker(speed: f32) -> Adversary {
        Adversary {
            id: 1,
            kind: AdversaryKind::Walker,
            x: 0.0,
            y: 0.0,
            health: 30.0,
            max_health: 30.0,
            speed,
            base_speed: speed,
            size: 14.0,
            facing: 0.0,
            contact_damage: 8.0,
            boss_phase: 0,
            ability: AbilityState::None,
            effects: EffectState::default(),
            despawn_at: None,
        }
    }

    #[test]
    fn freeze_zeroes_speed_and_snapshots_original() {
        let now = Instant::now();
        let mut a = walker(70.0);
        apply_freeze(&mut a, Duration::from_secs(1), now);
        assert_eq!(a.speed, 0.0);
        assert_eq!(a.effects.frozen.unwrap().original_speed, 70.0);
    }

    #[test]
    fn slow_after_freeze_keeps_true_original() {
        let now = Instant::now();
        let mut a = walker(70.0);
        apply_freeze(&mut a, Duration::from_secs(1), now);
        apply_slow(&mut a, 0.5, Duration::from_secs(5), now);
        // Frozen still wins.
        assert_eq!(a.speed, 0.0);
        assert_eq!(a.effects.slowed.unwrap().original_speed, 70.0);
    }

    #[test]
    fn slow_halves_speed_and_restores() {
        let now = Instant::now();
        let mut a = walker(80.0);
        apply_slow(&mut a, 0.5, Duration::from_secs(2), now);
        assert_eq!(a.speed, 40.0);
        assert_eq!(a.effects.slowed.unwrap().original_speed, 80.0);
    }
}
