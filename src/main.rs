mod api;
mod config;
mod db;
mod engine;
mod error;
mod feed;
mod refresher;
mod state;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::watchlist;
use crate::error::Result;
use crate::feed::FeedClient;
use crate::refresher::TickerRefresher;
use crate::state::TokenStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    let seeded = watchlist::seed_if_empty(&pool, &cfg.seed_addresses).await?;
    if seeded > 0 {
        info!("Seeded watch-list with {seeded} default addresses");
    }
    let watched = watchlist::addresses(&pool).await?;
    if watched.is_empty() {
        warn!("Watch-list is empty. Add tokens with POST /tokens.");
    } else {
        info!("Watching {} tokens", watched.len());
    }

    // --- Shared state ---
    let latency = Arc::new(LatencyStats::new());
    let health = Arc::new(HealthState::new());
    let store = TokenStore::new();
    let feed = Arc::new(FeedClient::new(&cfg, Arc::clone(&latency))?);
    info!(
        feed = %cfg.feed_api_url,
        proxied = cfg.proxy_url.is_some(),
        "Feed client ready"
    );

    // --- Spawn tasks ---

    // Ticker refresher (background, every REFRESH_INTERVAL_SECS)
    let refresher = TickerRefresher::new(
        pool.clone(),
        Arc::clone(&feed),
        Arc::clone(&store),
        Arc::clone(&health),
        cfg.refresh_interval_secs,
    );
    tokio::spawn(async move { refresher.run().await });

    // HTTP API server
    let api_state = ApiState { pool, store, feed, health, latency };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
