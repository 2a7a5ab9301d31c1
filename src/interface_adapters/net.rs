use crate::domain::state::{Notification, PlayerInput};
use crate::interface_adapters::protocol::{
    ClientMessage, NoticeDto, ServerMessage, WorldUpdateDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::unique_id;
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const MAX_ACCOUNT_ID_LEN: usize = 128;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                // Convert once and broadcast shared UTF-8 bytes to all clients.
                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before a player_id exists.
    let conn_id = unique_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    span.record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        display_name = %ctx.display_name,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub player_id: u64,
    pub display_name: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    pub notice_rx: broadcast::Receiver<Notification>,
    pub server_state_rx: watch::Receiver<ServerState>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* any awaits so no packets are missed.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();
    let notice_rx = state.notice_tx.subscribe();
    let server_state_rx = state.server_state_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Player ids are assigned server-side; the join payload only carries
    // identity metadata.
    let player_id = unique_id();

    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
    };
    send_message(socket, &identity_msg).await?;

    // Join happens before the initial state message so the next snapshot
    // can include the newly spawned player. Compensate with Leave on any
    // later bootstrap failure.
    state
        .input_tx
        .send(GameEvent::Join {
            player_id,
            account_id: join.account_id.clone(),
            display_name: join.display_name.clone(),
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let initial_state = state.server_state_tx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    if let Err(e) = send_message(socket, &state_msg).await {
        state
            .input_tx
            .send(GameEvent::Leave { player_id })
            .await
            .map_err(|_| NetError::InputClosed)?;
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        display_name: join.display_name,
        input_tx: state.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        notice_rx,
        server_state_rx,
        lag_recovery_count: 0,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

struct JoinHandshake {
    account_id: Option<String>,
    display_name: String,
    bytes_in: u64,
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(ClientMessage::Input(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let display_name = payload.display_name.trim();
                if display_name.is_empty() || display_name.len() > MAX_DISPLAY_NAME_LEN {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid display name")
                            .await;
                    return Err(NetError::JoinRequired);
                }
                let account_id = payload
                    .account_id
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty() && a.len() <= MAX_ACCOUNT_ID_LEN);

                return Ok(JoinHandshake {
                    account_id,
                    display_name: display_name.to_string(),
                    bytes_in,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    // Serialize message safely; log JSON errors instead of panicking.
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_input(mut input: PlayerInput) -> Option<PlayerInput> {
    if !input.move_x.is_finite() || !input.move_y.is_finite() || !input.aim.is_finite() {
        return None;
    }

    input.move_x = input.move_x.clamp(-1.0, 1.0);
    input.move_y = input.move_y.clamp(-1.0, 1.0);

    Some(input)
}

fn process_input_message(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    input: PlayerInput,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(input) = sanitize_input(input) else {
        if should_log(last_invalid_input_log) {
            warn!(player_id, "invalid input values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match input_tx.try_send(GameEvent::Input { player_id, input }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        world_bytes_rx,
        world_latest_rx,
        notice_rx,
        server_state_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_world_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            let outcome =
                                forward_world_bytes(latest, socket, msgs_out, bytes_out).await;
                            if should_log(last_world_lag_log) {
                                debug!(
                                    player_id,
                                    count = *lag_recovery_count,
                                    "sent lag recovery snapshot"
                                );
                            }
                            match outcome {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            notice = notice_rx.recv() => {
                match notice {
                    Ok(n) => {
                        let msg = ServerMessage::Notice(NoticeDto::from(n));
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send notice");
                                true
                            }
                        }
                    }
                    // Notices are advisory; losing some under lag is fine.
                    Err(broadcast::error::RecvError::Lagged(_)) => false,
                    Err(broadcast::error::RecvError::Closed) => false,
                }
            }

            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => {
                        let st = server_state_rx.borrow().clone();
                        let msg = ServerMessage::GameState(st.into());
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send server state");
                                true
                            }
                        }
                    }
                    Err(_) => {
                        warn!(player_id, "server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    // Despawn on the way out; stats are debug-level breadcrumbs.
    if let Err(e) = input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)
    {
        if fatal.is_none() {
            fatal = Some(e);
        }
    }
    debug!(
        player_id,
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        invalid_json = *invalid_json,
        lag_recovery_count = *lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap.
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Input(input)) => process_input_message(
                        player_id,
                        input_tx,
                        input.into(),
                        last_input_full_log,
                        last_invalid_input_log,
                    ),
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}
