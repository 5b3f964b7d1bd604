use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use workboard_backend_client::RestBackend;
use workboard_core::BackendClient;
use workboard_mcp_server::{ServerConfig, ToolContext, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // A .env next to the binary is a convenience for local runs; absence
    // is not an error.
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env().context("loading configuration")?;
    let backend: Arc<dyn BackendClient> =
        Arc::new(RestBackend::new(&config.org_url, &config.project, &config.token)?);
    let ctx = Arc::new(ToolContext::new(backend, &config));

    tokio::select! {
        result = serve(ctx) => result.context("serving stdio"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    }
}
