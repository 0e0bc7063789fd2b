//! Push endpoint for enrollment events.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use enrollwatch_common::error::AppError;
use enrollwatch_common::types::{ChannelType, EnrollmentEvent, EnrollmentOutcome};
use enrollwatch_notifier::DispatchReport;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", post(ingest_event))
}

/// Response for a processed event.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub outcome: EnrollmentOutcome,
    pub diagnostics: Vec<String>,
    /// False when the event was filtered out before dispatch
    pub notified: bool,
    /// True when at least one channel accepted the notification
    pub delivered: bool,
    /// Channels tried, in order; empty when nothing was dispatched
    pub attempted: Vec<ChannelType>,
    pub delivered_channels: Vec<ChannelType>,
    pub dispatch: Option<DispatchReport>,
}

/// POST /api/events: classify, enrich, render and dispatch one event.
///
/// Delivery failure is reported in the body, not as an HTTP error.
async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<EnrollmentEvent>,
) -> Result<Json<EventResponse>, AppError> {
    if event.device_name.trim().is_empty() && event.serial_number.trim().is_empty() {
        return Err(AppError::Validation(
            "device_name or serial_number is required".to_string(),
        ));
    }

    let result = state.processor.process(event).await;
    let (attempted, delivered_channels) = result
        .dispatch
        .as_ref()
        .map(|report| (report.attempted.clone(), report.delivered_channels.clone()))
        .unwrap_or_default();

    Ok(Json(EventResponse {
        notified: result.notified(),
        delivered: result.delivered(),
        attempted,
        delivered_channels,
        event_id: result.event.id,
        outcome: result.event.outcome,
        diagnostics: result.event.diagnostics,
        dispatch: result.dispatch,
    }))
}
