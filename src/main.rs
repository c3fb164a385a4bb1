use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trade_marshals_midtier::{config, server, HttpBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, honouring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Trade Marshals midtier...");

    // Load configuration
    let app_config = config::load_app_config("config/config.yaml")
        .await?
        .with_env_overrides();

    info!(backend_url = %app_config.backend_url, "Using backend service");

    let backend = Arc::new(HttpBackend::new(app_config.backend_url.clone()));

    // Start web server
    server::start_server(app_config, backend).await?;

    Ok(())
}
