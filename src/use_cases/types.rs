// Use-case level inputs/outputs for the world task.

use crate::domain::state::{
    AdversarySnapshot, EntityId, PickupSnapshot, PlayerInput, PlayerSnapshot, ProjectileSnapshot,
};

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        player_id: EntityId,
        account_id: Option<String>,
        display_name: String,
    },
    Leave {
        player_id: EntityId,
    },
    Input {
        player_id: EntityId,
        input: PlayerInput,
    },
}

#[derive(Debug, Clone)]
pub enum ServerState {
    Starting,
    Running,
    ShuttingDown,
}

/// Full-state snapshot broadcast after every completed tick.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub wave: u32,
    pub players: Vec<PlayerSnapshot>,
    pub adversaries: Vec<AdversarySnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
}
