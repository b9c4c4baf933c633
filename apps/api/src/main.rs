mod auth;
mod config;
mod errors;
mod fsbid;
mod fsbid_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::fsbid::suggestions::FsbidPositionCounter;
use crate::fsbid_client::FsbidClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TalentMap API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the FSBid client (one connection pool for every upstream root)
    let fsbid = FsbidClient::new(Duration::from_secs(config.upstream_timeout_secs))?;
    info!(
        "FSBid client initialized (root: {}, timeout: {}s)",
        config.fsbid_api_url, config.upstream_timeout_secs
    );

    // Position counts for client suggestions come from the cycle positions API
    let position_counter = Arc::new(FsbidPositionCounter::new(
        fsbid.clone(),
        config.cp_api_url.clone(),
    ));

    // Build app state
    let state = AppState {
        fsbid,
        config: config.clone(),
        position_counter,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the frontend origin once it is configurable

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
