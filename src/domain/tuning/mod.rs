// Gameplay tuning, separate from runtime/server configuration.

pub mod adversary;
pub mod boss;
pub mod player;
pub mod projectile;
pub mod wave;

pub use adversary::AdversaryTuning;
pub use player::PlayerTuning;
pub use projectile::ProjectileTuning;
pub use wave::WaveTuning;

/// Bundle threaded through the tick phases.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
    pub adversary: AdversaryTuning,
    pub wave: WaveTuning,
}
