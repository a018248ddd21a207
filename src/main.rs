//! PDF Signature Stripper - Entry point
//!
//! An MCP server that removes digital signatures from stored PDFs.

use pdf_signature_stripper::{run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_signature_stripper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting PDF signature stripper");

    let config = ServerConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    run_server_with_config(config).await
}
