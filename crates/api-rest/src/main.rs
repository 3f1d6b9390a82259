//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development when you want the REST server with Swagger UI bound to a fixed
//! address. The workspace's main `cds-run` binary resolves its port from `PORT` instead.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cds_core::CoreConfig;

/// Main entry point for the CDS REST API server
///
/// # Environment Variables
/// - `CDS_REST_ADDR`: Server address (default: "0.0.0.0:8501")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the embedded eligibility table fails validation,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("cds_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CDS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8501".into());

    tracing::info!("-- Starting CDS REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::new()?);
    tracing::info!(
        "-- Loaded eligibility table with {} conditions",
        cfg.eligibility_table().len()
    );

    let app = api_rest::router(cfg);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
