//! Turns an enriched event into a channel-neutral notification payload.

use enrollwatch_common::types::{EnrollmentEvent, EnrollmentOutcome, NotificationPayload};

use crate::enrichment::parse_iso8601_duration_secs;

/// Render an enriched event.
pub fn render(event: &EnrollmentEvent) -> NotificationPayload {
    let device = event.display_name();

    let (title, summary) = match event.outcome {
        EnrollmentOutcome::Success => (
            format!("✅ Enrollment succeeded: {}", device),
            format!("{} completed Autopilot deployment.", device),
        ),
        EnrollmentOutcome::Warning => (
            format!("⚠️ Enrollment needs attention: {}", device),
            format!(
                "{} reported deployment state '{}'.",
                device,
                non_empty(&event.status).unwrap_or("unknown")
            ),
        ),
        EnrollmentOutcome::Failure => (
            format!("❌ Enrollment failed: {}", device),
            match event.diagnostics.first() {
                Some(first) => format!("{} failed Autopilot deployment. {}", device, first),
                None => format!("{} failed Autopilot deployment.", device),
            },
        ),
        EnrollmentOutcome::Unknown => (
            format!("❔ Enrollment state unknown: {}", device),
            format!(
                "{} reported an unrecognized deployment state '{}'.",
                device,
                non_empty(&event.status).unwrap_or("none")
            ),
        ),
    };

    let mut facts: Vec<(String, String)> = Vec::new();
    let mut fact = |label: &str, value: Option<&str>| {
        if let Some(v) = value.and_then(non_empty) {
            facts.push((label.to_string(), v.to_string()));
        }
    };

    fact("Device", Some(event.device_name.as_str()));
    fact("Serial number", Some(event.serial_number.as_str()));
    fact("User", event.user_principal_name.as_deref());
    fact("Status", Some(event.status.as_str()));
    fact("Enrollment state", event.enrollment_state.as_deref());
    fact("Profile", event.profile_name.as_deref());
    fact("OS version", event.os_version.as_deref());
    let duration = event
        .deployment_duration
        .as_deref()
        .and_then(parse_iso8601_duration_secs)
        .map(format_duration);
    fact("Duration", duration.as_deref());
    let occurred = event.occurred_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    fact("Time", Some(occurred.as_str()));

    NotificationPayload {
        title,
        summary,
        outcome: event.outcome,
        facts,
        diagnostics: event.diagnostics.clone(),
        occurred_at: event.occurred_at,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
