// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use mams_node::auth::{AuthGate, TokenSigner, UserStore};
use mams_node::config::NodeConfig;
use mams_node::engine::Engine;
use mams_node::server::{build_router, AppState};
use mams_node::telemetry::init_telemetry;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!(
        "Initializing MAMS node: bind={} data_dir={:?} utc_offset={}",
        cfg.bind_addr,
        cfg.data_dir,
        cfg.utc_offset
    );
    if cfg.uses_dev_secret() {
        tracing::warn!("MAMS_TOKEN_SECRET not set: signing tokens with the development secret");
    }
    if cfg.admin_tool_key.is_none() {
        tracing::info!("Admin tool key not configured: /admin/*/replace requires a session token");
    }

    // Replay before accepting traffic. A corrupt log stops startup.
    let engine = Engine::open(&cfg).map_err(|e| {
        tracing::error!("Failed to recover event log: {}", e);
        e
    })?;
    let users = UserStore::open(cfg.users_path())?;
    tracing::info!("Loaded {} registered users", users.len());

    let gate = AuthGate::new(
        TokenSigner::new(&cfg.token_secret, cfg.token_ttl_secs),
        cfg.admin_tool_key.as_deref(),
    );
    let app = build_router(AppState::new(engine, users, gate));

    let listener = TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("Listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
