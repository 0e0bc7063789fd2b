//! Device-management API access.
//!
//! The rest of the system only sees [`EnrollmentSource::fetch_changed_entities`].
//! [`GraphAutopilotSource`] implements it against the Microsoft Graph
//! `deviceManagement/autopilotEvents` collection.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;

use enrollwatch_common::types::{EnrollmentEvent, EnrollmentOutcome};
use enrollwatch_notifier::sender::error_body;

/// Upper bound on followed `@odata.nextLink` pages per fetch.
const MAX_PAGES: usize = 50;

/// Anything that can list enrollment events changed since a point in time.
#[async_trait]
pub trait EnrollmentSource: Send + Sync {
    async fn fetch_changed_entities(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EnrollmentEvent>>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("device API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("device API paging exceeded {0} pages")]
    TooManyPages(usize),
}

/// One page of an OData collection response.
#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Wire shape of a Graph `deviceManagementAutopilotEvent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotEventRecord {
    pub id: String,
    pub event_date_time: DateTime<Utc>,
    pub device_serial_number: Option<String>,
    pub managed_device_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub windows_autopilot_deployment_profile_display_name: Option<String>,
    pub enrollment_state: Option<String>,
    pub deployment_state: Option<String>,
    pub device_setup_status: Option<String>,
    pub account_setup_status: Option<String>,
    pub os_version: Option<String>,
    pub deployment_total_duration: Option<String>,
    pub deployment_duration: Option<String>,
    pub enrollment_failure_details: Option<String>,
}

impl From<AutopilotEventRecord> for EnrollmentEvent {
    fn from(record: AutopilotEventRecord) -> Self {
        EnrollmentEvent {
            id: record.id,
            device_name: record.managed_device_name.unwrap_or_default(),
            serial_number: record.device_serial_number.unwrap_or_default(),
            user_principal_name: record.user_principal_name,
            status: record.deployment_state.unwrap_or_default(),
            enrollment_state: record.enrollment_state,
            os_version: record.os_version,
            profile_name: record.windows_autopilot_deployment_profile_display_name,
            failure_details: record.enrollment_failure_details,
            device_setup_status: record.device_setup_status,
            account_setup_status: record.account_setup_status,
            deployment_duration: record
                .deployment_total_duration
                .or(record.deployment_duration),
            occurred_at: record.event_date_time,
            outcome: EnrollmentOutcome::Unknown,
            diagnostics: Vec::new(),
        }
    }
}

/// Reads Autopilot deployment events from Microsoft Graph.
pub struct GraphAutopilotSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GraphAutopilotSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// First-page URL for events at or after `since`.
    pub fn events_url(&self, since: DateTime<Utc>) -> String {
        format!(
            "{}/deviceManagement/autopilotEvents?$filter=eventDateTime%20ge%20{}&$orderby=eventDateTime",
            self.base_url,
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    async fn fetch_page(&self, url: &str) -> anyhow::Result<ODataPage<AutopilotEventRecord>> {
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            }
            .into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EnrollmentSource for GraphAutopilotSource {
    async fn fetch_changed_entities(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EnrollmentEvent>> {
        let mut events = Vec::new();
        let mut next = Some(self.events_url(since));
        let mut pages = 0usize;

        while let Some(url) = next {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(SourceError::TooManyPages(MAX_PAGES).into());
            }

            let page = self.fetch_page(&url).await?;
            tracing::debug!(page = pages, records = page.value.len(), "Fetched autopilot events page");

            events.extend(page.value.into_iter().map(EnrollmentEvent::from));
            next = page.next_link;
        }

        Ok(events)
    }
}
