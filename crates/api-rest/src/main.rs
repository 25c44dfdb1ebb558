//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the TMC REST API server on its own, wired to default collaborators
//! (in-memory candidate directory, tracing-backed audit and notifications).
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server
//! (with OpenAPI/Swagger UI). Deployments use the workspace's main `tmc-run`
//! binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tmc_core::MatchEngine;

/// Main entry point for the standalone TMC REST API server.
///
/// # Environment Variables
/// - `TMC_REST_ADDR`: Server address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("TMC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting TMC REST API on {}", addr);

    let engine = MatchEngine::with_defaults();
    let app = api_rest::build_router(engine);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
