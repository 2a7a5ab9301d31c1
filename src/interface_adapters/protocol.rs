// Wire protocol DTOs and conversions for public game server messages.
// Internal service-to-service DTOs should live outside this module.

use crate::domain::state::{
    AdversarySnapshot, Notification, PickupSnapshot, PlayerInput, PlayerSnapshot,
    ProjectileSnapshot,
};
use crate::use_cases::{ServerState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String },
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
    // High-level server lifecycle transitions.
    GameState(ServerStateDto),
    // Advisory gameplay notices (wave starts, boss events, combos).
    Notice(NoticeDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message with identity metadata.
    Join(JoinPayload),
    // Input messages sent after a successful Join.
    Input(PlayerInputDto),
}

/// Payload for the Join handshake. `account_id` is the persistence
/// identity; guests leave it out and are never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub account_id: Option<String>,
    pub display_name: String,
}

/// Per-tick input payload sent by the client after joining.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerInputDto {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub move_y: f32,
    #[serde(default)]
    pub aim: f32,
    #[serde(default)]
    pub firing: bool,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            move_x: input.move_x,
            move_y: input.move_y,
            aim: input.aim,
            firing: input.firing,
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub wave: u32,
    pub players: Vec<PlayerStateDto>,
    pub adversaries: Vec<AdversaryStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
    pub pickups: Vec<PickupStateDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            wave: update.wave,
            players: update.players.iter().map(PlayerStateDto::from).collect(),
            adversaries: update
                .adversaries
                .iter()
                .map(AdversaryStateDto::from)
                .collect(),
            projectiles: update
                .projectiles
                .iter()
                .map(ProjectileStateDto::from)
                .collect(),
            pickups: update.pickups.iter().map(PickupStateDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub aim: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub level: u32,
    pub combo: u32,
    pub score: u64,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            x: p.x,
            y: p.y,
            aim: p.aim,
            hp: p.health,
            max_hp: p.max_health,
            level: p.level,
            combo: p.combo,
            score: p.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdversaryStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub size: f32,
    pub boss: bool,
    pub boss_phase: u8,
}

impl From<&AdversarySnapshot> for AdversaryStateDto {
    fn from(a: &AdversarySnapshot) -> Self {
        Self {
            id: a.id.to_string(),
            x: a.x,
            y: a.y,
            hp: a.health,
            max_hp: a.max_health,
            size: a.size,
            boss: a.boss,
            boss_phase: a.boss_phase,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub hostile: bool,
}

impl From<&ProjectileSnapshot> for ProjectileStateDto {
    fn from(p: &ProjectileSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            x: p.x,
            y: p.y,
            hostile: p.hostile,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

impl From<&PickupSnapshot> for PickupStateDto {
    fn from(p: &PickupSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            x: p.x,
            y: p.y,
        }
    }
}

/// Advisory notice pushed to all clients; purely informational.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum NoticeDto {
    ComboUpdate { player_id: String, combo: u32 },
    ComboReset { player_id: String, best: u32 },
    LevelUp { player_id: String, level: u32 },
    WaveStarted { wave: u32, target: u32 },
    BossSpawned { wave: u32, name: String },
    BossDefeated { wave: u32 },
}

impl From<Notification> for NoticeDto {
    fn from(n: Notification) -> Self {
        match n {
            Notification::ComboUpdate { player_id, combo } => NoticeDto::ComboUpdate {
                player_id: player_id.to_string(),
                combo,
            },
            Notification::ComboReset { player_id, best } => NoticeDto::ComboReset {
                player_id: player_id.to_string(),
                best,
            },
            Notification::LevelUp { player_id, level } => NoticeDto::LevelUp {
                player_id: player_id.to_string(),
                level,
            },
            Notification::WaveStarted { wave, target } => {
                NoticeDto::WaveStarted { wave, target }
            }
            Notification::BossSpawned { wave, name } => NoticeDto::BossSpawned {
                wave,
                name: name.to_string(),
            },
            Notification::BossDefeated { wave } => NoticeDto::BossDefeated { wave },
        }
    }
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Starting,
    Running,
    ShuttingDown,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Starting => ServerStateDto::Starting,
            ServerState::Running => ServerStateDto::Running,
            ServerState::ShuttingDown => ServerStateDto::ShuttingDown,
        }
    }
}
