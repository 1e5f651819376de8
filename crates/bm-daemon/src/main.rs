//! bm-daemon entry point.
//!
//! Thin: loads config, sets up tracing, connects the purchase store, wires
//! middleware, and starts the HTTP server. Route handlers live in
//! `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use bm_config::{
    load_layered_yaml, report_unused_keys, resolve_secrets_for_mode, ConfigMode, LoadedConfig,
    MarketSettings, UnusedKeyPolicy,
};
use bm_daemon::{routes, state};
use bm_db::PgPurchaseSource;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Comma-separated YAML layers, base first.
const ENV_CONFIG_PATHS: &str = "BM_CONFIG";
const ENV_DAEMON_ADDR: &str = "BM_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config_from_env()?;
    let unused = report_unused_keys(ConfigMode::Service, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "config contains unused keys");
    }
    let settings = MarketSettings::from_config_json(&loaded.config_json)?;
    let secrets = resolve_secrets_for_mode(&loaded.config_json, ConfigMode::Service)?;

    let pool = bm_db::connect(secrets.require_database_url()?).await?;
    let st = bm_db::status(&pool).await?;
    if !st.has_purchases_table {
        anyhow::bail!("purchases table missing; run `bm db migrate` first");
    }

    let addr = bind_addr(&settings)?;
    let shared = Arc::new(
        state::AppState::new(Arc::new(PgPurchaseSource::new(pool)), settings)
            .with_config_hash(loaded.config_hash.clone()),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!(config_hash = %loaded.config_hash, "bm-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
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

fn load_config_from_env() -> anyhow::Result<LoadedConfig> {
    let raw = match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return Ok(LoadedConfig::empty()),
    };
    let paths: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    load_layered_yaml(&paths)
}

/// BM_DAEMON_ADDR, then `/daemon/bind_addr`, then localhost.
fn bind_addr(settings: &MarketSettings) -> anyhow::Result<SocketAddr> {
    let configured = std::env::var(ENV_DAEMON_ADDR)
        .ok()
        .or_else(|| settings.daemon_bind_addr.clone());
    match configured {
        Some(s) => s
            .parse()
            .with_context(|| format!("invalid bind address: {s}")),
        None => Ok(SocketAddr::from(([127, 0, 0, 1], 8787))),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
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
