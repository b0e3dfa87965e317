//! HTTP client for the monitoring backend.
//!
//! Every response, success or not, carries the `{status, data | message}`
//! envelope, so bodies are decoded before the HTTP status is looked at.

use crate::models::{
    Alert, ApiEnvelope, ArchiveDateUpdate, Report, Snapshot, Statistics, UserMappingUpdate,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend answered HTTP {0}")]
    Status(StatusCode),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Rejected { message: String },
    #[error("response without data")]
    MissingData,
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder =
            Client::builder().user_agent(concat!("pcwatch-dashboard/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base: Url::parse(base_url)?,
        })
    }

    /// Builds `base/seg/seg/...`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        let response = self.http.get(url).send().await?;
        let envelope: ApiEnvelope<T> = decode_envelope(response).await?;
        envelope.data.ok_or(BackendError::MissingData)
    }

    async fn put_json<B: Serialize>(&self, url: Url, body: &B) -> Result<String, BackendError> {
        let response = self.http.put(url).json(body).send().await?;
        let envelope: ApiEnvelope<serde_json::Value> = decode_envelope(response).await?;
        Ok(envelope.message.unwrap_or_default())
    }

    pub async fn fetch_statistics(&self) -> Result<Statistics, BackendError> {
        self.get_data(self.endpoint(&["api", "statistics"])?).await
    }

    pub async fn fetch_latest_reports(&self) -> Result<Vec<Report>, BackendError> {
        self.get_data(self.endpoint(&["api", "reports", "latest"])?).await
    }

    pub async fn fetch_alerts(&self) -> Result<Vec<Alert>, BackendError> {
        self.get_data(self.endpoint(&["api", "alerts"])?).await
    }

    pub async fn fetch_history(
        &self,
        computer_name: &str,
        days: u32,
    ) -> Result<Vec<Report>, BackendError> {
        let mut url = self.endpoint(&["api", "reports", "history", computer_name])?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        self.get_data(url).await
    }

    /// The three read endpoints, concurrently; fails as soon as one fails.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, BackendError> {
        let (statistics, reports, alerts) = tokio::try_join!(
            self.fetch_statistics(),
            self.fetch_latest_reports(),
            self.fetch_alerts(),
        )?;
        Ok(Snapshot { statistics, reports, alerts })
    }

    /// PUT /api/user-mappings/{computer_name}; returns the backend message.
    pub async fn update_display_name(
        &self,
        computer_name: &str,
        windows_user: &str,
        display_name: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&["api", "user-mappings", computer_name])?;
        self.put_json(url, &UserMappingUpdate { windows_user, display_name }).await
    }

    /// PUT /api/archive-date/{computer_name}; returns the backend message.
    pub async fn update_archive_date(
        &self,
        computer_name: &str,
        archive_date: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&["api", "archive-date", computer_name])?;
        self.put_json(url, &ArchiveDateUpdate { archive_date }).await
    }
}

async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiEnvelope<T>, BackendError> {
    let status = response.status();
    let body = response.bytes().await?;

    let envelope: ApiEnvelope<T> = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(BackendError::Status(status)),
        Err(e) => return Err(BackendError::Decode(e)),
    };

    if !envelope.is_success() {
        return Err(BackendError::Rejected {
            message: envelope
                .message
                .unwrap_or_else(|| format!("backend answered status \"{}\"", envelope.status)),
        });
    }
    Ok(envelope)
}
