//! Notification router: picks channel(s) by delivery mode and falls back.
//!
//! Routing rules:
//! - `Teams` / `Email` send to that channel only. When fallback is enabled
//!   and the send fails, the other configured channel is tried.
//! - `Both` sends to every channel; delivery succeeds if at least one does.
//!
//! Failures are logged and folded into a boolean. There is no retry here;
//! each sender's HTTP client timeout is the only recovery.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use enrollwatch_common::config::AppConfig;
use enrollwatch_common::error::AppError;
use enrollwatch_common::types::{ChannelType, DeliveryMode, NotificationPayload};

use crate::email::EmailSender;
use crate::sender::{ChannelHealth, NotificationSender, http_client};
use crate::teams::TeamsSender;

/// What happened to one dispatched notification.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// Correlates the log lines of one dispatch
    pub dispatch_id: Uuid,
    /// Channels a send was attempted on, in order
    pub attempted: Vec<ChannelType>,
    /// Channels that accepted the notification
    pub delivered_channels: Vec<ChannelType>,
    /// Per-channel failure messages
    pub errors: Vec<(ChannelType, String)>,
}

impl DispatchReport {
    /// Overall result: at least one channel accepted the notification.
    pub fn delivered(&self) -> bool {
        !self.delivered_channels.is_empty()
    }
}

/// Routes rendered notifications to the configured sender(s).
pub struct NotificationRouter {
    mode: DeliveryMode,
    fallback: bool,
    senders: HashMap<ChannelType, Arc<dyn NotificationSender>>,
}

impl NotificationRouter {
    /// Build a router from explicit senders.
    ///
    /// Fails when the mode names a channel that has no sender.
    pub fn new(
        mode: DeliveryMode,
        fallback: bool,
        senders: Vec<Arc<dyn NotificationSender>>,
    ) -> Result<Self, AppError> {
        let senders: HashMap<ChannelType, Arc<dyn NotificationSender>> = senders
            .into_iter()
            .map(|sender| (sender.channel(), sender))
            .collect();

        if let Some(missing) = mode.channels().iter().find(|c| !senders.contains_key(*c)) {
            return Err(AppError::Config(format!(
                "delivery mode '{}' needs the {} channel, which is not configured",
                mode, missing
            )));
        }

        Ok(Self {
            mode,
            fallback,
            senders,
        })
    }

    /// Build a router with HTTP senders for every channel the config fully describes.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let client = http_client(config.http_timeout_secs)
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mut senders: Vec<Arc<dyn NotificationSender>> = Vec::new();

        if let Some(url) = config.teams_webhook() {
            senders.push(Arc::new(TeamsSender::new(client.clone(), url.to_string())));
        }

        match config.email_settings() {
            Some((key, from, to)) => senders.push(Arc::new(EmailSender::new(
                client.clone(),
                config.resend_api_url.clone(),
                key.to_string(),
                from.to_string(),
                to.to_vec(),
            ))),
            None if config.resend_api_key.is_some() || config.email_from.is_some() => {
                tracing::warn!(
                    "Email channel partially configured (needs RESEND_API_KEY, EMAIL_FROM and EMAIL_TO)"
                );
            }
            None => {}
        }

        let router = Self::new(config.delivery_mode, config.delivery_fallback, senders)?;

        tracing::info!(
            mode = %router.mode,
            fallback = router.fallback,
            channels = ?router.configured_channels(),
            "Notification router ready"
        );

        Ok(router)
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Channels with a sender, in a stable order.
    pub fn configured_channels(&self) -> Vec<ChannelType> {
        [ChannelType::Teams, ChannelType::Email]
            .into_iter()
            .filter(|c| self.senders.contains_key(c))
            .collect()
    }

    /// Dispatch a notification. Returns `true` if any channel delivered it.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> bool {
        self.dispatch_report(payload).await.delivered()
    }

    /// Dispatch a notification and report per-channel results.
    pub async fn dispatch_report(&self, payload: &NotificationPayload) -> DispatchReport {
        let mut report = DispatchReport {
            dispatch_id: Uuid::new_v4(),
            attempted: Vec::new(),
            delivered_channels: Vec::new(),
            errors: Vec::new(),
        };

        for channel in self.mode.channels() {
            self.try_send(*channel, payload, &mut report).await;
        }

        if self.fallback && self.mode != DeliveryMode::Both && !report.delivered() {
            let primary = self.mode.channels()[0];
            let secondary = primary.other();
            if self.senders.contains_key(&secondary) {
                tracing::warn!(
                    dispatch_id = %report.dispatch_id,
                    primary = %primary,
                    fallback = %secondary,
                    "Primary channel failed, falling back"
                );
                self.try_send(secondary, payload, &mut report).await;
            }
        }

        if report.delivered() {
            tracing::info!(
                dispatch_id = %report.dispatch_id,
                outcome = %payload.outcome,
                delivered = ?report.delivered_channels,
                "Notification delivered"
            );
        } else {
            tracing::error!(
                dispatch_id = %report.dispatch_id,
                outcome = %payload.outcome,
                attempted = ?report.attempted,
                "Notification not delivered on any channel"
            );
        }

        report
    }

    async fn try_send(
        &self,
        channel: ChannelType,
        payload: &NotificationPayload,
        report: &mut DispatchReport,
    ) {
        let Some(sender) = self.senders.get(&channel) else {
            return;
        };

        report.attempted.push(channel);
        match sender.send(payload).await {
            Ok(()) => report.delivered_channels.push(channel),
            Err(e) => {
                tracing::warn!(
                    dispatch_id = %report.dispatch_id,
                    channel = %channel,
                    error = %e,
                    "Channel delivery failed"
                );
                report.errors.push((channel, e.to_string()));
            }
        }
    }

    /// Probe every configured channel.
    pub async fn health(&self) -> Vec<ChannelHealth> {
        let mut results = Vec::with_capacity(self.senders.len());
        for channel in self.configured_channels() {
            if let Some(sender) = self.senders.get(&channel) {
                results.push(sender.check_connectivity().await);
            }
        }
        results
    }
}
