//! Email sender backed by the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;

use enrollwatch_common::types::{ChannelType, EnrollmentOutcome, NotificationPayload};

use crate::sender::{ChannelHealth, DeliveryError, NotificationSender, error_body};

/// Request body for `POST /emails`.
#[derive(Debug, Serialize)]
pub struct ResendEmail<'a> {
    pub from: &'a str,
    pub to: &'a [String],
    pub subject: &'a str,
    pub html: String,
    pub text: String,
}

/// Sends notifications as HTML email through Resend.
pub struct EmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    to: Vec<String>,
}

impl EmailSender {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            to,
        }
    }

    /// Build the Resend request body for a payload.
    pub fn build_email<'a>(&'a self, payload: &'a NotificationPayload) -> ResendEmail<'a> {
        ResendEmail {
            from: &self.from,
            to: &self.to,
            subject: &payload.title,
            html: render_html(payload),
            text: render_text(payload),
        }
    }
}

fn accent(outcome: EnrollmentOutcome) -> &'static str {
    match outcome {
        EnrollmentOutcome::Success => "#2eb886",
        EnrollmentOutcome::Warning => "#ffb900",
        EnrollmentOutcome::Failure => "#d13438",
        EnrollmentOutcome::Unknown => "#8a8886",
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(payload: &NotificationPayload) -> String {
    let mut html = format!(
        "<div style=\"font-family:Segoe UI,Arial,sans-serif\">\
         <h2 style=\"border-left:6px solid {};padding-left:8px\">{}</h2>\
         <p>{}</p><table>",
        accent(payload.outcome),
        escape_html(&payload.title),
        escape_html(&payload.summary),
    );
    for (name, value) in &payload.facts {
        html.push_str(&format!(
            "<tr><td style=\"padding-right:12px\"><b>{}</b></td><td>{}</td></tr>",
            escape_html(name),
            escape_html(value)
        ));
    }
    html.push_str("</table>");

    if !payload.diagnostics.is_empty() {
        html.push_str("<h3>Diagnostics</h3><ul>");
        for diagnostic in &payload.diagnostics {
            html.push_str(&format!("<li>{}</li>", escape_html(diagnostic)));
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");
    html
}

fn render_text(payload: &NotificationPayload) -> String {
    let mut text = format!("{}\n\n{}\n\n", payload.title, payload.summary);
    for (name, value) in &payload.facts {
        text.push_str(&format!("{}: {}\n", name, value));
    }
    if !payload.diagnostics.is_empty() {
        text.push_str("\nDiagnostics:\n");
        for diagnostic in &payload.diagnostics {
            text.push_str(&format!("- {}\n", diagnostic));
        }
    }
    text
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn channel(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_email(payload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                channel: ChannelType::Email,
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        tracing::debug!(
            recipients = self.to.len(),
            status = status.as_u16(),
            "Email accepted by Resend"
        );
        Ok(())
    }

    async fn check_connectivity(&self) -> ChannelHealth {
        let result = self
            .client
            .get(format!("{}/domains", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                ChannelHealth::reachable(ChannelType::Email, "Resend API key accepted")
            }
            Ok(response) => ChannelHealth::unreachable(
                ChannelType::Email,
                format!("Resend API answered with {}", response.status().as_u16()),
            ),
            Err(e) => ChannelHealth::unreachable(ChannelType::Email, e.to_string()),
        }
    }
}
