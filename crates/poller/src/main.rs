use std::sync::Arc;

use enrollwatch_common::config::AppConfig;
use enrollwatch_engine::EnrollmentProcessor;
use enrollwatch_notifier::sender::http_client;
use enrollwatch_poller::poller::EnrollmentPoller;
use enrollwatch_poller::source::GraphAutopilotSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "enrollwatch_poller=info,enrollwatch_engine=info,enrollwatch_notifier=info".into()
            }),
        )
        .json()
        .init();

    tracing::info!("EnrollWatch poller starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    let token = config
        .device_api_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DEVICE_API_TOKEN environment variable is required"))?;

    let client = http_client(config.http_timeout_secs)?;
    let source = GraphAutopilotSource::new(client, config.device_api_base_url.clone(), token);

    // Router + pipeline
    let processor = EnrollmentProcessor::from_config(&config)?;

    let mut poller = EnrollmentPoller::new(
        Arc::new(source),
        Arc::new(processor),
        config.poll_interval_secs,
        config.poll_lookback_secs,
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Enrollment poller exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("EnrollWatch poller stopped.");
    Ok(())
}
