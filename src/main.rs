use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cds_core::CoreConfig;
use cds_core::config::port_from_env_value;

/// Main entry point for the CDS application
///
/// Loads the eligibility table once, then serves the REST API (with Swagger UI) for both the
/// eligibility and triage engines.
///
/// # Environment Variables
/// - `PORT`: Listening port (default: 8501)
/// - `CDS_BIND_HOST`: Bind address (default: "0.0.0.0")
/// - `RUST_LOG`: Extra tracing directives on top of `cds_run=info`
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server itself fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cds_run=info".parse()?)
                .add_directive("cds_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = port_from_env_value(std::env::var("PORT").ok())?;
    let host = std::env::var("CDS_BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let cfg = Arc::new(CoreConfig::new()?);

    tracing::info!("++ Starting CDS REST on {}", addr);
    tracing::info!(
        "++ Eligibility table loaded: {} conditions",
        cfg.eligibility_table().len()
    );

    let app = api_rest::router(cfg);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
