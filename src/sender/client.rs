//! HTTP point sender for the InfluxDB v1 write endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, InfluxConfig};
use crate::display;

/// Errors from sending a point.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("Write rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Write timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("Write request failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered 2xx.
    Delivered,
    /// Endpoint answered with a non-success status.
    Rejected { status: u16, body: String },
    /// No usable answer: connect error, I/O error or timeout.
    TransportFailure { reason: String, timed_out: bool },
}

/// Destination for serialized points.
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Deliver one line-protocol string. A single attempt, no retry.
    async fn send(&self, line_protocol: &str) -> Result<(), SendError>;
}

#[async_trait]
impl<T: PointSink + ?Sized> PointSink for Arc<T> {
    async fn send(&self, line_protocol: &str) -> Result<(), SendError> {
        (**self).send(line_protocol).await
    }
}

/// Build an HTTP client bounded by `timeout`.
fn build_http_client(timeout: Duration) -> Result<Client, SendError> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| SendError::ClientBuild(e.to_string()))
}

/// Sends points to `/write?db=...` with one POST per point.
#[derive(Debug, Clone)]
pub struct InfluxSender {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl InfluxSender {
    /// Create a sender for `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `SendError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, SendError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url,
            timeout,
        })
    }

    /// Create a sender from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the write URL is invalid or the client cannot be built.
    pub fn from_config(config: &InfluxConfig) -> Result<Self, SendError> {
        Self::new(config.write_url()?, config.timeout())
    }

    /// Write URL the sender posts to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write URL with credentials removed: scheme, authority, path and `db`.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        let db = self
            .url
            .query_pairs()
            .find(|(key, _)| key == "db")
            .map(|(_, value)| value.into_owned());
        url.set_query(None);
        if let Some(db) = db {
            url.query_pairs_mut().append_pair("db", &db);
        }
        let _ = url.set_password(None);
        let _ = url.set_username("");
        url.to_string()
    }

    /// Attempt one delivery and classify the result.
    pub async fn deliver(&self, line_protocol: &str) -> DeliveryOutcome {
        let result = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line_protocol.to_string())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // reqwest embeds the request URL, which carries `u` and `p`.
                let timed_out = e.is_timeout();
                return DeliveryOutcome::TransportFailure {
                    reason: e.without_url().to_string(),
                    timed_out,
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            return DeliveryOutcome::Delivered;
        }

        let body = response.text().await.unwrap_or_default();
        DeliveryOutcome::Rejected {
            status: status.as_u16(),
            body: body.trim().to_string(),
        }
    }

    fn outcome_to_result(&self, outcome: DeliveryOutcome) -> Result<(), SendError> {
        match outcome {
            DeliveryOutcome::Delivered => Ok(()),
            DeliveryOutcome::Rejected { status, body } => Err(SendError::Rejected { status, body }),
            DeliveryOutcome::TransportFailure {
                timed_out: true, ..
            } => Err(SendError::Timeout(self.timeout)),
            DeliveryOutcome::TransportFailure { reason, .. } => Err(SendError::Transport(reason)),
        }
    }
}

#[async_trait]
impl PointSink for InfluxSender {
    async fn send(&self, line_protocol: &str) -> Result<(), SendError> {
        let outcome = self.deliver(line_protocol).await;
        let result = self.outcome_to_result(outcome);

        if let Err(e) = &result {
            tracing::error!(url = %self.redacted_url(), error = %e, "Point delivery failed");
            display::print_error(&e.to_string());
        }

        result
    }
}
