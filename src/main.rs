//! Sus Game Server
//!
//! Authoritative lobby server for the social-deduction party game.
//! Reads configuration from the environment and serves WebSocket clients
//! until interrupted.

use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sus::{
    VERSION,
    config::AppConfig,
    game::session::GameSession,
    network::server::GameServer,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Sus Server v{}", VERSION);

    let config = AppConfig::from_env().context("failed to read configuration")?;

    let catalog = config.load_catalog().context("unusable task catalog")?;
    info!(
        "Rules: {}-{} players, {} tasks each, {} tasks in catalog",
        config.rules.min_players,
        config.rules.max_players,
        config.rules.tasks_per_player,
        catalog.len()
    );

    let engine = GameSession::new(config.rules.clone(), Arc::new(catalog));
    let server = Arc::new(GameServer::new(config.server.clone(), engine));

    let runner = server.clone();
    let mut handle = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut handle => {
            result.context("server task panicked")?.context("server failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for ctrl-c: {}", e);
            }
            info!("Interrupted, shutting down");
            server.shutdown();
            handle.await.context("server task panicked")?.context("server failed")?;
        }
    }

    Ok(())
}
