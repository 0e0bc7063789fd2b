//! EnrollWatch API server binary entrypoint.

use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use enrollwatch_common::config::AppConfig;
use enrollwatch_engine::EnrollmentProcessor;

use enrollwatch_api::routes::create_router;
use enrollwatch_api::state::AppState;

/// Enrollment events are small; anything larger is not one.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "enrollwatch_api=debug,enrollwatch_engine=debug,enrollwatch_notifier=debug,tower_http=debug",
            )
        }))
        .init();

    tracing::info!("Starting EnrollWatch API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Router + pipeline
    let processor = EnrollmentProcessor::from_config(&config)?;

    let addr = config.api_listen_addr;
    let state = AppState::new(processor);

    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    Ok(())
}
