//! Microsoft Teams incoming-webhook sender.

use async_trait::async_trait;
use serde_json::{Value, json};

use enrollwatch_common::types::{ChannelType, EnrollmentOutcome, NotificationPayload};

use crate::sender::{ChannelHealth, DeliveryError, NotificationSender, error_body};

/// Posts legacy `MessageCard` payloads to a Teams incoming webhook.
pub struct TeamsSender {
    client: reqwest::Client,
    webhook_url: String,
}

impl TeamsSender {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    /// Card accent colour per outcome.
    fn theme_color(outcome: EnrollmentOutcome) -> &'static str {
        match outcome {
            EnrollmentOutcome::Success => "2EB886",
            EnrollmentOutcome::Warning => "FFB900",
            EnrollmentOutcome::Failure => "D13438",
            EnrollmentOutcome::Unknown => "8A8886",
        }
    }

    /// Build the `MessageCard` body for a payload.
    pub fn build_card(payload: &NotificationPayload) -> Value {
        let facts: Vec<Value> = payload
            .facts
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();

        let mut sections = vec![json!({
            "activityTitle": payload.summary,
            "facts": facts,
            "markdown": true,
        })];

        if !payload.diagnostics.is_empty() {
            let text = payload
                .diagnostics
                .iter()
                .map(|d| format!("- {}", d))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(json!({
                "title": "Diagnostics",
                "text": text,
                "markdown": true,
            }));
        }

        json!({
            "@type": "MessageCard",
            "@context": "https://schema.org/extensions",
            "summary": payload.title,
            "themeColor": Self::theme_color(payload.outcome),
            "title": payload.title,
            "sections": sections,
        })
    }
}

#[async_trait]
impl NotificationSender for TeamsSender {
    fn channel(&self) -> ChannelType {
        ChannelType::Teams
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::build_card(payload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                channel: ChannelType::Teams,
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        tracing::debug!(status = status.as_u16(), "Teams webhook accepted card");
        Ok(())
    }

    /// Incoming webhooks only accept POST, so any HTTP answer to a GET proves
    /// the endpoint is reachable. Only transport failures count as down.
    async fn check_connectivity(&self) -> ChannelHealth {
        match self.client.get(&self.webhook_url).send().await {
            Ok(response) => ChannelHealth::reachable(
                ChannelType::Teams,
                format!("webhook host answered with {}", response.status().as_u16()),
            ),
            Err(e) => ChannelHealth::unreachable(ChannelType::Teams, e.to_string()),
        }
    }
}
