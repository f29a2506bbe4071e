//! Proposal generator web server
//!
//! Reads config from env vars (a `.env` file is honoured):
//!   DOCGEN_TEMPLATE   : DOCX template path
//!   DOCGEN_OUTPUT_DIR : generated documents (default: output)
//!   DOCGEN_STATIC_DIR : front end root (default: frontend)
//!   DOCGEN_BIND_ADDR  : listen address (default: 0.0.0.0:5000, or 0.0.0.0:$PORT)

use std::sync::Arc;

use anyhow::Context;
use kikaku_docgen::{create_docgen_router, AppConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kikaku_docgen=info,docgen_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());

    config.ensure_output_dir().with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    if config.template_exists() {
        info!("Using template {}", config.template_path.display());
    } else {
        warn!(
            "Template {} not found; /template and /generate will answer with a hint",
            config.template_path.display()
        );
    }

    let app = create_docgen_router(Arc::clone(&config));

    info!("Starting server on {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
