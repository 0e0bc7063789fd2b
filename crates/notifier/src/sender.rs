//! The channel sender abstraction shared by every delivery channel.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use enrollwatch_common::types::{ChannelType, NotificationPayload};

/// Why a single channel failed to deliver.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} rejected the message with status {status}: {body}")]
    Rejected {
        channel: ChannelType,
        status: u16,
        body: String,
    },
}

/// Connectivity check result for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHealth {
    pub channel: ChannelType,
    pub reachable: bool,
    pub detail: String,
}

impl ChannelHealth {
    pub fn reachable(channel: ChannelType, detail: impl Into<String>) -> Self {
        Self {
            channel,
            reachable: true,
            detail: detail.into(),
        }
    }

    pub fn unreachable(channel: ChannelType, detail: impl Into<String>) -> Self {
        Self {
            channel,
            reachable: false,
            detail: detail.into(),
        }
    }
}

/// A delivery channel. Implementations own their HTTP client and credentials.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Which channel this sender delivers to.
    fn channel(&self) -> ChannelType;

    /// Deliver one notification. No retries beyond the HTTP client's own.
    async fn send(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;

    /// Probe the channel without delivering a message.
    async fn check_connectivity(&self) -> ChannelHealth;
}

/// Build the shared reqwest client used by the HTTP senders.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, DeliveryError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("enrollwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Read a response body for error reporting, clipped to keep logs readable.
pub async fn error_body(response: reqwest::Response) -> String {
    const MAX_BODY: usize = 512;
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_BODY {
        let mut cut = MAX_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    #[tokio::test]
    async fn test_error_body_is_clipped_on_char_boundary() {
        let app = Router::new().route(
            "/",
            get(|| async { (StatusCode::BAD_REQUEST, "é".repeat(400)) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        let body = error_body(response).await;
        assert!(body.ends_with('…'));
        assert_eq!(body.chars().filter(|c| *c == 'é').count(), 256);
    }
}
