mod activity;
mod config;
mod coordinator;
mod error;
mod presence;
mod protocol;
mod providers;
mod relay;
mod rooms;
mod routes;
mod state;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use config::{generate_config_template, Config};
use coordinator::SessionCoordinator;
use providers::memory::MemoryWorkspace;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "collab_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "collab_server=info".parse().unwrap()),
            )
            .init();
    }

    // Standalone mode runs against the in-memory workspace store. Real
    // deployments construct the coordinator through the library with
    // their own provider implementations.
    let workspace = Arc::new(MemoryWorkspace::new());
    let coordinator = Arc::new(SessionCoordinator::new(
        workspace.clone(),
        workspace.clone(),
        workspace.clone(),
        workspace,
        Duration::from_millis(config.provider_timeout_ms),
    ));

    let app = routes::build_router(AppState { coordinator });

    let listener = TcpListener::bind(config.server_address()).await?;
    info!(address = %config.server_address(), "Collaboration coordinator listening");

    axum::serve(listener, app).await?;
    Ok(())
}
