use std::net::SocketAddr;

use crate::types::DeliveryMode;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Device-management API base URL (Graph beta endpoint by default)
    pub device_api_base_url: String,

    /// Bearer token for the device-management API. Required by the poller only.
    pub device_api_token: Option<String>,

    /// Poll interval in seconds (default: 300)
    pub poll_interval_secs: u64,

    /// How far back the first poll looks, in seconds (default: the poll interval)
    pub poll_lookback_secs: u64,

    /// Channel selection for notifications (default: both)
    pub delivery_mode: DeliveryMode,

    /// Try the other channel when a single-channel send fails (default: false)
    pub delivery_fallback: bool,

    /// Microsoft Teams incoming webhook URL
    pub teams_webhook_url: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Resend API base URL
    pub resend_api_url: String,

    /// Email sender address
    pub email_from: Option<String>,

    /// Email recipients
    pub email_to: Vec<String>,

    /// Also notify on successful enrollments (default: true)
    pub notify_on_success: bool,

    /// Deployments longer than this are flagged as slow (default: 60)
    pub long_deployment_minutes: u64,

    /// Timeout for every outbound HTTP request (default: 30)
    pub http_timeout_secs: u64,

    /// Listen address for the API server
    pub api_listen_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let poll_interval_secs: u64 = var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|| "300".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("POLL_INTERVAL_SECS must be a valid u64"))?;
        if poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            device_api_base_url: var("DEVICE_API_BASE_URL")
                .unwrap_or_else(|| "https://graph.microsoft.com/beta".to_string())
                .trim_end_matches('/')
                .to_string(),
            device_api_token: var("DEVICE_API_TOKEN"),
            poll_interval_secs,
            poll_lookback_secs: match var("POLL_LOOKBACK_SECS") {
                Some(v) => v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("POLL_LOOKBACK_SECS must be a valid u64"))?,
                None => poll_interval_secs,
            },
            delivery_mode: var("DELIVERY_MODE")
                .unwrap_or_else(|| "both".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("DELIVERY_MODE: {}", e))?,
            delivery_fallback: parse_bool("DELIVERY_FALLBACK", var("DELIVERY_FALLBACK"), false)?,
            teams_webhook_url: var("TEAMS_WEBHOOK_URL"),
            resend_api_key: var("RESEND_API_KEY"),
            resend_api_url: var("RESEND_API_URL")
                .unwrap_or_else(|| "https://api.resend.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            email_from: var("EMAIL_FROM"),
            email_to: var("EMAIL_TO")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            notify_on_success: parse_bool("NOTIFY_ON_SUCCESS", var("NOTIFY_ON_SUCCESS"), true)?,
            long_deployment_minutes: var("LONG_DEPLOYMENT_MINUTES")
                .unwrap_or_else(|| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LONG_DEPLOYMENT_MINUTES must be a valid u64"))?,
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            api_listen_addr: var("API_LISTEN_ADDR")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_LISTEN_ADDR must be a socket address"))?,
        })
    }

    /// Teams webhook URL, if the Teams channel is configured.
    pub fn teams_webhook(&self) -> Option<&str> {
        self.teams_webhook_url.as_deref()
    }

    /// API key, sender and recipients, if the email channel is fully configured.
    pub fn email_settings(&self) -> Option<(&str, &str, &[String])> {
        match (&self.resend_api_key, &self.email_from) {
            (Some(key), Some(from)) if !self.email_to.is_empty() => {
                Some((key.as_str(), from.as_str(), self.email_to.as_slice()))
            }
            _ => None,
        }
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!("{} must be a boolean", key)),
        },
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
