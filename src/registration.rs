//! White-label registration: announce this service instance to the central directory.
//!
//! Registration is best-effort. The directory de-duplicates by (service name, context
//! type), so re-registering after a restart is safe; this side never retries.

use crate::error::RegistrationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REGISTER_PATH: &str = "/api/WhiteLabel/Register";

/// What gets announced. `directory_address` is where it is sent, not part of the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDescriptor {
    pub service_name: String,
    #[serde(skip)]
    pub directory_address: String,
    pub context_type: String,
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> Result<(), RegistrationError>;
}

/// Directory reached over HTTP: `POST {address}/api/WhiteLabel/Register` with a JSON
/// descriptor; any 2xx answer counts as registered.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    http: reqwest::Client,
}

impl HttpDirectoryClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistrationError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(HttpDirectoryClient { http })
    }
}

fn register_url(address: &str) -> Result<reqwest::Url, RegistrationError> {
    let invalid = |message: String| RegistrationError::InvalidAddress {
        address: address.to_string(),
        message,
    };
    let url = reqwest::Url::parse(&format!("{}{}", address.trim_end_matches('/'), REGISTER_PATH))
        .map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> Result<(), RegistrationError> {
        let url = register_url(&descriptor.directory_address)?;
        let response = self.http.post(url).json(descriptor).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistrationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Outcome reported by readiness checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Skipped { reason: String },
    Failed { reason: String },
}

impl RegistrationStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationStatus::Registered)
    }
}

pub struct WhiteLabelManager<D> {
    client: D,
    timeout: Duration,
}

impl WhiteLabelManager<HttpDirectoryClient> {
    pub fn http(timeout: Duration) -> Result<Self, RegistrationError> {
        Ok(WhiteLabelManager::new(HttpDirectoryClient::new(timeout)?, timeout))
    }
}

impl<D: DirectoryClient> WhiteLabelManager<D> {
    pub fn new(client: D, timeout: Duration) -> Self {
        WhiteLabelManager { client, timeout }
    }

    /// Send one registration. Never blocks longer than the configured timeout.
    pub async fn initialize(
        &self,
        service_label: &str,
        directory_address: &str,
        context_type: &str,
    ) -> Result<(), RegistrationError> {
        let directory_address = directory_address.trim();
        if directory_address.is_empty() {
            return Err(RegistrationError::MissingAddress);
        }
        let descriptor = RegistrationDescriptor {
            service_name: service_label.to_string(),
            directory_address: directory_address.to_string(),
            context_type: context_type.to_string(),
        };
        tokio::time::timeout(self.timeout, self.client.register(&descriptor))
            .await
            .map_err(|_| RegistrationError::Timeout(self.timeout))??;
        tracing::info!(
            service = service_label,
            directory = directory_address,
            context = context_type,
            "registered with white-label directory"
        );
        Ok(())
    }

    /// [`initialize`](Self::initialize), with failures logged and folded into the status.
    pub async fn register_best_effort(
        &self,
        service_label: &str,
        directory_address: Option<&str>,
        context_type: &str,
    ) -> RegistrationStatus {
        let Some(address) = directory_address else {
            tracing::warn!(service = service_label, "no white-label address configured; service will not be discoverable");
            return RegistrationStatus::Skipped {
                reason: RegistrationError::MissingAddress.to_string(),
            };
        };
        match self.initialize(service_label, address, context_type).await {
            Ok(()) => RegistrationStatus::Registered,
            Err(RegistrationError::MissingAddress) => {
                tracing::warn!(service = service_label, "no white-label address configured; service will not be discoverable");
                RegistrationStatus::Skipped {
                    reason: RegistrationError::MissingAddress.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(service = service_label, directory = address, error = %e, "white-label registration failed");
                RegistrationStatus::Failed { reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<RegistrationDescriptor>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl DirectoryClient for Recording {
        async fn register(&self, descriptor: &RegistrationDescriptor) -> Result<(), RegistrationError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.sent.lock().unwrap().push(descriptor.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn sends_descriptor() {
        let manager = WhiteLabelManager::new(Recording::default(), Duration::from_secs(1));
        manager.initialize("Comment", " http://directory ", "CommentContext").await.unwrap();
        let sent = manager.client.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![RegistrationDescriptor {
                service_name: "Comment".into(),
                directory_address: "http://directory".into(),
                context_type: "CommentContext".into(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_address_is_skipped_not_sent() {
        let manager = WhiteLabelManager::new(Recording::default(), Duration::from_secs(1));
        let err = manager.initialize("Comment", "  ", "CommentContext").await.unwrap_err();
        assert!(matches!(err, RegistrationError::MissingAddress));
        let status = manager.register_best_effort("Comment", None, "CommentContext").await;
        assert!(matches!(status, RegistrationStatus::Skipped { .. }));
        assert!(manager.client.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_directory_times_out() {
        let client = Recording {
            delay: Some(Duration::from_secs(30)),
            ..Recording::default()
        };
        let manager = WhiteLabelManager::new(client, Duration::from_millis(50));
        let err = manager.initialize("Comment", "http://directory", "CommentContext").await.unwrap_err();
        assert!(matches!(err, RegistrationError::Timeout(_)));
        let status = manager
            .register_best_effort("Comment", Some("http://directory"), "CommentContext")
            .await;
        assert!(matches!(status, RegistrationStatus::Failed { .. }));
    }

    #[test]
    fn register_url_joins_path_and_checks_scheme() {
        assert_eq!(
            register_url("http://directory:6041/").unwrap().as_str(),
            "http://directory:6041/api/WhiteLabel/Register"
        );
        assert!(matches!(register_url("not a url"), Err(RegistrationError::InvalidAddress { .. })));
        assert!(matches!(register_url("ftp://directory"), Err(RegistrationError::InvalidAddress { .. })));
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(RegistrationStatus::Failed { reason: "down".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "reason": "down"}));
    }
}
