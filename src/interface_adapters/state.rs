use crate::domain::state::Notification;
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Inputs flowing from the network into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // World updates produced by the world task (domain structs).
    pub world_tx: broadcast::Sender<WorldUpdate>,
    // Serialized world updates, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized world update for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    // Advisory gameplay notifications.
    pub notice_tx: broadcast::Sender<Notification>,
    // High-level server lifecycle state.
    pub server_state_tx: watch::Sender<ServerState>,
}
