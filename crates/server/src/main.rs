//! waypoint server entry point.
//!
//! Boots the caching agent and serves it over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use url::Url;
use waypoint_client::{Agent, FetchConfig, HttpNetwork};
use waypoint_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod host;
mod tools;

/// Base delay between install attempts; grows linearly per attempt.
const INSTALL_BACKOFF: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        namespace = %config.namespace,
        version = %config.version,
        origin = %config.origin,
        "Starting waypoint server on stdio transport"
    );

    let store = CacheDb::open(&config.db_path).await?;
    tracing::debug!(path = %config.db_path.display(), schema = store.schema_version().await?, "cache opened");
    let network = HttpNetwork::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        origin: Some(Url::parse(&config.origin)?),
        ..Default::default()
    })?;
    let agent = Arc::new(Agent::new(&config, Arc::new(store), Arc::new(network))?);

    let eviction = Arc::clone(agent.eviction()).spawn();

    // Runs beside the server so a held install can be released by SKIP_WAITING.
    let startup = {
        let agent = Arc::clone(&agent);
        let attempts = config.install_attempts;
        tokio::spawn(async move {
            match agent.start(attempts, INSTALL_BACKOFF).await {
                Ok(report) => tracing::info!(
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "agent active"
                ),
                Err(e) => tracing::error!("agent failed to start, requests will pass through: {}", e),
            }
        })
    };

    let handler = handler::WaypointServer::new(Arc::clone(&agent));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    startup.abort();
    eviction.abort();
    agent.drain().await;

    Ok(())
}
