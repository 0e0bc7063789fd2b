use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of an enrollment state transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentOutcome {
    Success,
    Warning,
    Failure,
    #[default]
    Unknown,
}

impl std::fmt::Display for EnrollmentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentOutcome::Success => write!(f, "success"),
            EnrollmentOutcome::Warning => write!(f, "warning"),
            EnrollmentOutcome::Failure => write!(f, "failure"),
            EnrollmentOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Notification channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Microsoft Teams incoming webhook
    Teams,
    /// Email through the Resend HTTP API
    Email,
}

impl ChannelType {
    /// The other channel, used when falling back from a failed send.
    pub fn other(self) -> Self {
        match self {
            ChannelType::Teams => ChannelType::Email,
            ChannelType::Email => ChannelType::Teams,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Teams => write!(f, "teams"),
            ChannelType::Email => write!(f, "email"),
        }
    }
}

/// Which channel(s) a notification is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Teams,
    Email,
    Both,
}

impl DeliveryMode {
    /// Channels targeted by this mode, in dispatch order.
    pub fn channels(self) -> &'static [ChannelType] {
        match self {
            DeliveryMode::Teams => &[ChannelType::Teams],
            DeliveryMode::Email => &[ChannelType::Email],
            DeliveryMode::Both => &[ChannelType::Teams, ChannelType::Email],
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teams" | "chat" => Ok(DeliveryMode::Teams),
            "email" | "mail" => Ok(DeliveryMode::Email),
            "both" | "all" => Ok(DeliveryMode::Both),
            other => Err(format!("unknown delivery mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Teams => write!(f, "teams"),
            DeliveryMode::Email => write!(f, "email"),
            DeliveryMode::Both => write!(f, "both"),
        }
    }
}

/// One device enrollment state transition reported by the device-management API.
///
/// `outcome` and `diagnostics` are derived: the pipeline fills them in place
/// and ignores whatever the producer supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentEvent {
    /// Upstream event id
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub serial_number: String,
    pub user_principal_name: Option<String>,
    /// Raw deployment state string (e.g. "failure", "inProgress")
    #[serde(default)]
    pub status: String,
    /// Raw enrollment state string, used when `status` says nothing
    pub enrollment_state: Option<String>,
    pub os_version: Option<String>,
    /// Deployment profile display name
    pub profile_name: Option<String>,
    /// Free-form failure text, usually carrying a hex error code
    pub failure_details: Option<String>,
    pub device_setup_status: Option<String>,
    pub account_setup_status: Option<String>,
    /// ISO-8601 duration (e.g. "PT1H12M30S")
    pub deployment_duration: Option<String>,
    pub occurred_at: DateTime<Utc>,

    #[serde(default)]
    pub outcome: EnrollmentOutcome,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl EnrollmentEvent {
    /// Best human label for the device: name, then serial, then event id.
    pub fn display_name(&self) -> &str {
        if !self.device_name.trim().is_empty() {
            &self.device_name
        } else if !self.serial_number.trim().is_empty() {
            &self.serial_number
        } else {
            &self.id
        }
    }
}

/// Channel-neutral notification ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Short title (e.g., "❌ Enrollment failed: LAPTOP-042")
    pub title: String,
    /// One-sentence summary
    pub summary: String,
    pub outcome: EnrollmentOutcome,
    /// Ordered label/value pairs
    pub facts: Vec<(String, String)>,
    pub diagnostics: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_mode_parse_aliases() {
        assert_eq!("chat".parse::<DeliveryMode>().unwrap(), DeliveryMode::Teams);
        assert_eq!(" Teams ".parse::<DeliveryMode>().unwrap(), DeliveryMode::Teams);
        assert_eq!("MAIL".parse::<DeliveryMode>().unwrap(), DeliveryMode::Email);
        assert_eq!("all".parse::<DeliveryMode>().unwrap(), DeliveryMode::Both);
        assert!("pager".parse::<DeliveryMode>().is_err());
    }

    #[test]
    fn test_both_mode_targets_teams_then_email() {
        assert_eq!(
            DeliveryMode::Both.channels(),
            &[ChannelType::Teams, ChannelType::Email]
        );
        assert_eq!(ChannelType::Teams.other(), ChannelType::Email);
    }

    #[test]
    fn test_event_deserialize_optional_fields() {
        let event: EnrollmentEvent = serde_json::from_value(serde_json::json!({
            "device_name": "LAPTOP-042",
            "status": "failure",
            "outcome": "success",
            "occurred_at": "2026-10-01T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(event.device_name, "LAPTOP-042");
        assert!(event.serial_number.is_empty());
        assert!(event.diagnostics.is_empty());
        assert_eq!(event.outcome, EnrollmentOutcome::Success);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut event: EnrollmentEvent = serde_json::from_value(serde_json::json!({
            "id": "evt-1",
            "serial_number": "SN123",
            "occurred_at": "2026-10-01T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(event.display_name(), "SN123");
        event.serial_number.clear();
        assert_eq!(event.display_name(), "evt-1");
    }
}
