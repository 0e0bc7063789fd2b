//! Health check endpoint with per-channel connectivity.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health: check connectivity of every configured channel.
///
/// `ok` when every channel answers, `degraded` when some do, 503 when none do.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let channels = state.processor.router().health().await;
    let reachable = channels.iter().filter(|c| c.reachable).count();

    let (code, status) = if reachable == channels.len() {
        (StatusCode::OK, "ok")
    } else if reachable > 0 {
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    if reachable < channels.len() {
        tracing::warn!(reachable, configured = channels.len(), "Channel connectivity degraded");
    }

    (
        code,
        Json(json!({
            "status": status,
            "service": "enrollwatch-api",
            "version": env!("CARGO_PKG_VERSION"),
            "mode": state.processor.router().mode(),
            "channels": channels,
        })),
    )
}
