use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use enrollwatch_engine::{BatchSummary, EnrollmentProcessor};

use crate::source::EnrollmentSource;

/// Longest first-poll lookback honoured (30 days).
const MAX_LOOKBACK_SECS: u64 = 30 * 86_400;

/// Fixed-interval poller that feeds changed enrollment events into the pipeline.
///
/// The watermark lives in memory only. It moves to the start time of a poll
/// once that poll's fetch succeeded, so a failed fetch is retried from the
/// same point on the next tick.
pub struct EnrollmentPoller {
    source: Arc<dyn EnrollmentSource>,
    processor: Arc<EnrollmentProcessor>,
    poll_interval: Duration,
    watermark: DateTime<Utc>,
}

impl EnrollmentPoller {
    pub fn new(
        source: Arc<dyn EnrollmentSource>,
        processor: Arc<EnrollmentProcessor>,
        poll_interval_secs: u64,
        lookback_secs: u64,
    ) -> Self {
        let lookback = chrono::Duration::seconds(lookback_secs.min(MAX_LOOKBACK_SECS) as i64);
        Self {
            source,
            processor,
            poll_interval: Duration::from_secs(poll_interval_secs),
            watermark: Utc::now() - lookback,
        }
    }

    /// Override the starting watermark.
    pub fn with_watermark(mut self, watermark: DateTime<Utc>) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// Run a single poll cycle.
    pub async fn poll_once(&mut self) -> anyhow::Result<BatchSummary> {
        let started = Utc::now();
        let events = self.source.fetch_changed_entities(self.watermark).await?;

        if events.is_empty() {
            tracing::debug!(since = %self.watermark, "No enrollment changes");
        } else {
            tracing::info!(
                since = %self.watermark,
                events = events.len(),
                "Fetched enrollment changes"
            );
        }

        let summary = self.processor.process_batch(events).await;
        self.watermark = started;
        Ok(summary)
    }

    /// Start the polling loop. Runs indefinitely until the task is cancelled.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            since = %self.watermark,
            mode = %self.processor.router().mode(),
            "Enrollment poller started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                Ok(summary) if summary.processed > 0 => {
                    tracing::info!(
                        processed = summary.processed,
                        skipped = summary.skipped,
                        delivered = summary.delivered,
                        failed = summary.failed,
                        "Poll cycle complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        since = %self.watermark,
                        error = %e,
                        "Poll cycle failed, will retry from the same watermark"
                    );
                }
            }
        }
    }
}
