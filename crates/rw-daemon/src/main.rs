//! rw-daemon entry point.
//!
//! Thin: loads config, sets up tracing, builds the shared state, starts the
//! heartbeat and monitor loops, wires middleware and serves HTTP. Handlers
//! live in `routes.rs`; shared state and the tick live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use rw_config::load_monitor_config;
use rw_daemon::{routes, state};
use rw_sources::Sources;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const DEFAULT_CONFIG: &str = "config/reservewatch.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let validated = load_monitor_config(&path_refs)
        .with_context(|| format!("load config {}", paths.join(",")))?;
    info!(
        config_hash = %validated.config_hash,
        mode = validated.policy.mode.as_str(),
        "config loaded"
    );

    let shared = Arc::new(state::AppState::new(
        validated.policy.clone(),
        Some(validated.config_hash.clone()),
    ));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    state::spawn_monitor(
        Arc::clone(&shared),
        Sources::from_config(&validated.config),
        Duration::from_secs(validated.config.poll.interval_s),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(a) => a,
        None => validated
            .config
            .daemon
            .addr
            .parse()
            .with_context(|| format!("daemon.addr '{}'", validated.config.daemon.addr))?,
    };
    info!("rw-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `RW_CONFIG` is a comma-separated list of layered config files.
fn config_paths_from_env() -> Vec<String> {
    let raw = std::env::var("RW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("RW_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
