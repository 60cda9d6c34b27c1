use std::path::Path;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod config;
mod error;
mod ingestion;
mod items;
mod ollama;
mod pipeline;
mod service;
mod tasks;
#[cfg(test)]
mod testing;
mod vision;

use crate::service::DocentService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Docent service v{}", env!("CARGO_PKG_VERSION"));

    // DOCENT_CONFIG points at an explicit config file; otherwise ./config.* is used
    let config = match std::env::var_os("DOCENT_CONFIG") {
        Some(path) => config::load_config_from(Path::new(&path))?,
        None => config::load_config()?,
    };
    info!(
        host = %config.server.host,
        port = config.server.port,
        ollama = %config.ollama.base_url,
        default_model = %config.ollama.default_model,
        "Configuration loaded"
    );

    // Prometheus recorder backing the /metrics endpoint
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install metrics recorder, /metrics will be empty");
            None
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let service = Arc::new(DocentService::new(config).await?);
    let app = api::router(service, metrics);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docent_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
