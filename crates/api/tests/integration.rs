//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! Channels are replaced with in-process senders, so no network is needed.
//!
//! ```bash
//! cargo test -p enrollwatch-api --test integration -- --nocapture
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use enrollwatch_api::routes::create_router;
use enrollwatch_api::state::AppState;
use enrollwatch_common::types::{ChannelType, DeliveryMode, NotificationPayload};
use enrollwatch_engine::EnrollmentProcessor;
use enrollwatch_engine::enrichment::EnrichmentRules;
use enrollwatch_notifier::{ChannelHealth, DeliveryError, NotificationRouter, NotificationSender};

// ============================================================
// Helpers
// ============================================================

/// In-process channel that records titles and can be told to fail.
struct FakeChannel {
    channel: ChannelType,
    healthy: bool,
    sent: Mutex<Vec<String>>,
}

impl FakeChannel {
    fn new(channel: ChannelType, healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            channel,
            healthy,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for FakeChannel {
    fn channel(&self) -> ChannelType {
        self.channel
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(payload.title.clone());
        if self.healthy {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                channel: self.channel,
                status: 500,
                body: "down".to_string(),
            })
        }
    }

    async fn check_connectivity(&self) -> ChannelHealth {
        if self.healthy {
            ChannelHealth::reachable(self.channel, "ok")
        } else {
            ChannelHealth::unreachable(self.channel, "connection refused")
        }
    }
}

fn build_app(
    mode: DeliveryMode,
    notify_on_success: bool,
    teams: &Arc<FakeChannel>,
    email: &Arc<FakeChannel>,
) -> axum::Router {
    let senders: Vec<Arc<dyn NotificationSender>> = vec![teams.clone(), email.clone()];
    let router = NotificationRouter::new(mode, false, senders).unwrap();
    let processor =
        EnrollmentProcessor::new(Arc::new(router), EnrichmentRules::default(), notify_on_success);
    create_router(AppState::new(processor))
}

fn post_event(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/events")
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================
// POST /api/events
// ============================================================

#[tokio::test]
async fn test_failure_event_is_delivered() {
    let teams = FakeChannel::new(ChannelType::Teams, true);
    let email = FakeChannel::new(ChannelType::Email, true);
    let app = build_app(DeliveryMode::Teams, true, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "id": "evt-100",
            "device_name": "LAPTOP-042",
            "serial_number": "SN-9981",
            "user_principal_name": "jane@example.com",
            "status": "failure",
            "failure_details": "ESP failed with 0x81036502",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["event_id"], "evt-100");
    assert_eq!(json["outcome"], "failure");
    assert_eq!(json["notified"], true);
    assert_eq!(json["delivered"], true);
    assert!(json["diagnostics"][0].as_str().unwrap().starts_with("0x81036502"));
    assert_eq!(json["attempted"], serde_json::json!(["teams"]));
    assert_eq!(json["delivered_channels"], serde_json::json!(["teams"]));

    assert_eq!(teams.sent(), vec!["❌ Enrollment failed: LAPTOP-042"]);
    assert!(email.sent().is_empty());
}

#[tokio::test]
async fn test_both_mode_with_one_failing_channel_reports_delivered() {
    let teams = FakeChannel::new(ChannelType::Teams, false);
    let email = FakeChannel::new(ChannelType::Email, true);
    let app = build_app(DeliveryMode::Both, true, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "device_name": "LAPTOP-042",
            "status": "failed",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["delivered"], true);
    assert_eq!(json["attempted"], serde_json::json!(["teams", "email"]));
    assert_eq!(json["delivered_channels"], serde_json::json!(["email"]));
    assert_eq!(json["dispatch"]["errors"][0][0], "teams");
}

#[tokio::test]
async fn test_all_channels_failing_reports_not_delivered() {
    let teams = FakeChannel::new(ChannelType::Teams, false);
    let email = FakeChannel::new(ChannelType::Email, false);
    let app = build_app(DeliveryMode::Both, true, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "device_name": "LAPTOP-042",
            "status": "failure",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["notified"], true);
    assert_eq!(json["delivered"], false);
    assert_eq!(json["attempted"], serde_json::json!(["teams", "email"]));
    assert_eq!(json["delivered_channels"], serde_json::json!([]));
}

#[tokio::test]
async fn test_success_filtered_when_disabled() {
    let teams = FakeChannel::new(ChannelType::Teams, true);
    let email = FakeChannel::new(ChannelType::Email, true);
    let app = build_app(DeliveryMode::Both, false, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "device_name": "LAPTOP-042",
            "status": "success",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["notified"], false);
    assert_eq!(json["attempted"], serde_json::json!([]));
    assert_eq!(json["delivered_channels"], serde_json::json!([]));
    assert!(json["dispatch"].is_null());
    assert!(teams.sent().is_empty());
}

#[tokio::test]
async fn test_out_of_range_duration_is_ignored() {
    let teams = FakeChannel::new(ChannelType::Teams, true);
    let email = FakeChannel::new(ChannelType::Email, true);
    let app = build_app(DeliveryMode::Teams, true, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "device_name": "LAPTOP-042",
            "status": "inProgress",
            "deployment_duration": "P999999999999999999999DT1S",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["outcome"], "warning");
    assert_eq!(json["delivered"], true);
    assert!(
        json["diagnostics"]
            .as_array()
            .unwrap()
            .iter()
            .all(|d| !d.as_str().unwrap().starts_with("Deployment took"))
    );
}

#[tokio::test]
async fn test_event_without_device_identity_is_rejected() {
    let teams = FakeChannel::new(ChannelType::Teams, true);
    let email = FakeChannel::new(ChannelType::Email, true);
    let app = build_app(DeliveryMode::Teams, true, &teams, &email);

    let response = app
        .oneshot(post_event(serde_json::json!({
            "status": "failure",
            "occurred_at": "2026-10-01T08:30:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "device_name or serial_number is required");
    assert!(teams.sent().is_empty());
}

// ============================================================
// GET /health
// ============================================================

async fn get_health(app: axum::Router) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

#[tokio::test]
async fn test_health_all_channels_reachable() {
    let teams = FakeChannel::new(ChannelType::Teams, true);
    let email = FakeChannel::new(ChannelType::Email, true);
    let (status, json) = get_health(build_app(DeliveryMode::Both, true, &teams, &email)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "enrollwatch-api");
    assert_eq!(json["mode"], "both");
    assert_eq!(json["channels"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_degraded_and_unavailable() {
    let teams = FakeChannel::new(ChannelType::Teams, false);
    let email = FakeChannel::new(ChannelType::Email, true);
    let (status, json) = get_health(build_app(DeliveryMode::Both, true, &teams, &email)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["channels"][0]["channel"], "teams");
    assert_eq!(json["channels"][0]["reachable"], false);

    let teams = FakeChannel::new(ChannelType::Teams, false);
    let email = FakeChannel::new(ChannelType::Email, false);
    let (status, json) = get_health(build_app(DeliveryMode::Both, true, &teams, &email)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unavailable");
}
