//! Enrollment processing pipeline.
//!
//! Receives raw enrollment events (from the poller or the HTTP API) and:
//! 1. Classifies them into an outcome (via `classifier`)
//! 2. Appends diagnostics in place (via `enrichment`)
//! 3. Drops successes when success notifications are disabled
//! 4. Renders a channel-neutral payload (via `render`)
//! 5. Hands the payload to the `NotificationRouter`

use std::sync::Arc;

use serde::Serialize;

use enrollwatch_common::config::AppConfig;
use enrollwatch_common::types::{EnrollmentEvent, EnrollmentOutcome};
use enrollwatch_notifier::{DispatchReport, NotificationRouter};

use crate::classifier::classify;
use crate::enrichment::{EnrichmentRules, enrich};
use crate::render::render;

/// Result of pushing one event through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// The classified and enriched event
    pub event: EnrollmentEvent,
    /// `None` when the event was filtered out before dispatch
    pub dispatch: Option<DispatchReport>,
}

impl ProcessOutcome {
    pub fn notified(&self) -> bool {
        self.dispatch.is_some()
    }

    pub fn delivered(&self) -> bool {
        self.dispatch.as_ref().is_some_and(DispatchReport::delivered)
    }
}

/// Counters for one batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Central pipeline that turns enrollment events into delivered notifications.
pub struct EnrollmentProcessor {
    router: Arc<NotificationRouter>,
    rules: EnrichmentRules,
    notify_on_success: bool,
}

impl EnrollmentProcessor {
    pub fn new(router: Arc<NotificationRouter>, rules: EnrichmentRules, notify_on_success: bool) -> Self {
        Self {
            router,
            rules,
            notify_on_success,
        }
    }

    /// Build the processor and its router from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let router = NotificationRouter::from_config(config)?;
        Ok(Self::new(
            Arc::new(router),
            EnrichmentRules {
                long_deployment_minutes: config.long_deployment_minutes,
            },
            config.notify_on_success,
        ))
    }

    pub fn router(&self) -> &Arc<NotificationRouter> {
        &self.router
    }

    /// Classify and enrich an event in place. Previously derived fields are reset.
    pub fn prepare(&self, event: &mut EnrollmentEvent) {
        event.diagnostics.clear();
        event.outcome = classify(event);
        enrich(event, &self.rules);
    }

    fn should_notify(&self, outcome: EnrollmentOutcome) -> bool {
        outcome != EnrollmentOutcome::Success || self.notify_on_success
    }

    /// Run one event through the full pipeline.
    pub async fn process(&self, mut event: EnrollmentEvent) -> ProcessOutcome {
        self.prepare(&mut event);

        if !self.should_notify(event.outcome) {
            tracing::debug!(
                event_id = %event.id,
                device = %event.display_name(),
                "Success notification disabled, skipping"
            );
            return ProcessOutcome {
                event,
                dispatch: None,
            };
        }

        let payload = render(&event);
        let report = self.router.dispatch_report(&payload).await;

        tracing::info!(
            event_id = %event.id,
            device = %event.display_name(),
            outcome = %event.outcome,
            diagnostics = event.diagnostics.len(),
            delivered = report.delivered(),
            "Enrollment event processed"
        );

        ProcessOutcome {
            event,
            dispatch: Some(report),
        }
    }

    /// Run a batch sequentially and tally the results.
    pub async fn process_batch(&self, events: Vec<EnrollmentEvent>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for event in events {
            let outcome = self.process(event).await;
            summary.processed += 1;
            if !outcome.notified() {
                summary.skipped += 1;
            } else if outcome.delivered() {
                summary.delivered += 1;
            } else {
                summary.failed += 1;
            }
        }

        summary
    }
}
