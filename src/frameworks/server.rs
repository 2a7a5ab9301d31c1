// Framework bootstrap for the game server runtime.

use crate::domain::state::{Arena, Notification, World};
use crate::domain::tuning::Tuning;
use crate::frameworks::config;
use crate::interface_adapters::clients::persistence::ProgressionClient;
use crate::interface_adapters::net::{world_update_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::ServerState;
use crate::use_cases::game::world_task;
use crate::use_cases::persistence::{DeathPersistence, RetryConfig, gateway_worker};
use crate::use_cases::scheduler::{SchedulerConfig, TickScheduler};

use axum::extract::ws::Utf8Bytes;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let progression_url = config::progression_service_url();
    let progression_timeout = config::progression_timeout();
    let progression = ProgressionClient::new(progression_url.clone(), progression_timeout)
        .map_err(|e| {
            std::io::Error::other(format!("failed to initialize progression client: {e}"))
        })?;
    tracing::debug!(
        progression_url = %progression_url,
        progression_timeout_ms = progression_timeout.as_millis(),
        "progression client configured"
    );

    // The gateway worker owns the HTTP client and runs submissions off
    // the tick path.
    let (submit_tx, submit_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    tokio::spawn(gateway_worker(progression, submit_rx, outcome_tx));
    let deaths = DeathPersistence::new(submit_tx, outcome_rx, RetryConfig::default());

    let seed = config::world_seed();
    let spawn_rate_modifier = config::spawn_rate_modifier();
    let mut world = World::new(Arena::default(), seed);
    world.waves.spawn_rate_modifier = spawn_rate_modifier;
    tracing::info!(seed, spawn_rate_modifier, "world initialized");

    let scheduler = TickScheduler::new(world, deaths, Tuning::default(), SchedulerConfig::default());

    let (input_tx, input_rx) = mpsc::channel(config::INPUT_CHANNEL_CAPACITY);
    let (world_tx, world_rx) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (world_bytes_tx, _) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _) = watch::channel(Utf8Bytes::default());
    let (notice_tx, _) = broadcast::channel::<Notification>(config::NOTICE_BROADCAST_CAPACITY);
    let (server_state_tx, _) = watch::channel(ServerState::Starting);

    let shutdown = Arc::new(tokio::sync::Notify::new());
    tokio::spawn(world_task(
        scheduler,
        input_rx,
        world_tx.clone(),
        notice_tx.clone(),
        server_state_tx.clone(),
        config::TICK_INTERVAL,
        shutdown,
    ));
    tokio::spawn(world_update_serializer(
        world_rx,
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));

    Ok(Arc::new(AppState {
        input_tx,
        world_tx,
        world_bytes_tx,
        world_latest_tx,
        notice_tx,
        server_state_tx,
    }))
}
