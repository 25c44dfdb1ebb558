//! Main entry point for the TMC application.
//!
//! Starts the REST server around one shared [`MatchEngine`] instance wired to
//! the default collaborators. Notification delivery and audit storage are
//! external concerns; the defaults emit structured log lines an external
//! subscriber can consume.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tmc_core::MatchEngine;

/// Main entry point for the TMC application.
///
/// # Environment Variables
/// - `TMC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `RUST_LOG`: tracing filter, e.g. `tmc=info`
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("tmc=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("TMC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("++ Starting TMC REST on {}", rest_addr);

    let engine = MatchEngine::with_defaults();
    let app = api_rest::build_router(engine);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
