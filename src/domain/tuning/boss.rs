/// Per-boss-type stat and phase data.
///
/// Phase thresholds and the abilities each phase unlocks are data here, not
/// logic in the wave machine: a boss's `phase` is the number of thresholds
/// its health fraction has crossed, and it never decreases.
use std::time::Duration;

use crate::domain::state::BossKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossAbility {
    GroundSlam,
    SummonMinions,
    ToxicBurst,
    FrostNova,
    ShieldWall,
    Enrage,
}

#[derive(Debug, Clone)]
pub struct BossSpec {
    pub name: &'static str,
    pub max_health: f32,
    pub speed: f32,
    pub size: f32,
    pub contact_damage: f32,
    /// Damage fraction absorbed while a shield is up.
    pub shield_mitigation: f32,
    /// Health-fraction thresholds, descending. Crossing the Nth unlocks
    /// `phase_abilities[N + 1]`.
    pub phase_thresholds: &'static [f32],
    /// Ability set available at each phase, cumulative by construction.
    pub phase_abilities: &'static [&'static [BossAbility]],
    pub slam_cooldown: Duration,
    pub summon_cooldown: Duration,
    pub ultimate_cooldown: Duration,
    pub shield_duration: Duration,
}

use BossAbility::*;

static ABOMINATION: BossSpec = BossSpec {
    name: "Abomination",
    max_health: 1000.0,
    speed: 55.0,
    size: 36.0,
    contact_damage: 20.0,
    shield_mitigation: 0.5,
    phase_thresholds: &[0.66, 0.25],
    phase_abilities: &[
        &[GroundSlam],
        &[GroundSlam, SummonMinions],
        &[GroundSlam, SummonMinions, ToxicBurst],
    ],
    slam_cooldown: Duration::from_millis(5000),
    summon_cooldown: Duration::from_millis(8000),
    ultimate_cooldown: Duration::from_millis(10000),
    shield_duration: Duration::from_millis(3000),
};

static LICH: BossSpec = BossSpec {
    name: "Lich",
    max_health: 850.0,
    speed: 45.0,
    size: 32.0,
    contact_damage: 16.0,
    shield_mitigation: 0.6,
    phase_thresholds: &[0.7, 0.3],
    phase_abilities: &[
        &[SummonMinions],
        &[SummonMinions, FrostNova],
        &[SummonMinions, FrostNova, ShieldWall],
    ],
    slam_cooldown: Duration::from_millis(6000),
    summon_cooldown: Duration::from_millis(6000),
    ultimate_cooldown: Duration::from_millis(9000),
    shield_duration: Duration::from_millis(4000),
};

static BEHEMOTH: BossSpec = BossSpec {
    name: "Behemoth",
    max_health: 1400.0,
    speed: 40.0,
    size: 44.0,
    contact_damage: 26.0,
    shield_mitigation: 0.4,
    phase_thresholds: &[0.5, 0.2],
    phase_abilities: &[
        &[GroundSlam],
        &[GroundSlam, ShieldWall],
        &[GroundSlam, ShieldWall, Enrage],
    ],
    slam_cooldown: Duration::from_millis(4000),
    summon_cooldown: Duration::from_millis(9000),
    ultimate_cooldown: Duration::from_millis(12000),
    shield_duration: Duration::from_millis(3500),
};

pub fn spec(kind: BossKind) -> &'static BossSpec {
    match kind {
        BossKind::Abomination => &ABOMINATION,
        BossKind::Lich => &LICH,
        BossKind::Behemoth => &BEHEMOTH,
    }
}

impl BossSpec {
    /// Phase implied by a health fraction: the number of thresholds crossed.
    pub fn phase_for_fraction(&self, fraction: f32) -> u8 {
        self.phase_thresholds
            .iter()
            .filter(|t| fraction <= **t)
            .count() as u8
    }

    pub fn unlocked(&self, phase: u8, ability: BossAbility) -> bool {
        let idx = (phase as usize).min(self.phase_abilities.len() - 1);
        self.phase_abilities[idx].contains(&ability)
    }
}
