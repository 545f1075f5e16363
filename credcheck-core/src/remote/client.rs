//! HTTP client for the verification service.
//!
//! One multipart request per verification. Connection failures and
//! 429/502/503/504 are retried with exponential backoff, at most
//! `max_retries` times; a timeout is not, since the upload may already have
//! been processed.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{multipart, Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::wire::{parse_certificate_response, parse_legacy_response, HealthStatus};
use super::{EndpointFlavor, VerificationService};
use crate::error::{CredCheckError, RemoteError, RemoteErrorKind, Result, GENERIC_FAILURE_MESSAGE};
use crate::ingest::UploadedDocument;
use crate::verdict::Outcome;

/// Default service location.
const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default timeout for a verification round trip (OCR is slow).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retry attempts.
const MAX_RETRIES: u32 = 2;

/// Initial retry interval.
const INITIAL_INTERVAL: Duration = Duration::from_millis(250);

/// Maximum retry interval.
const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for the verification client.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Service base URL, without trailing path.
    pub base_url: String,
    /// Which endpoint contract to speak.
    pub endpoint: EndpointFlavor,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Initial retry interval.
    pub initial_interval: Duration,
    /// Maximum retry interval.
    pub max_interval: Duration,
    /// Refuse plain-HTTP URLs and require TLS 1.3.
    pub https_only: bool,
}

impl Default for VerifierConfig {
    /// Reads `CREDCHECK_API_URL`, `CREDCHECK_TIMEOUT_SECS`,
    /// `CREDCHECK_MAX_RETRIES` and `CREDCHECK_LEGACY_ENDPOINT`.
    fn default() -> Self {
        let base_url =
            std::env::var("CREDCHECK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = std::env::var("CREDCHECK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let max_retries = std::env::var("CREDCHECK_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_RETRIES);

        let endpoint = if std::env::var("CREDCHECK_LEGACY_ENDPOINT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false)
        {
            EndpointFlavor::Legacy
        } else {
            EndpointFlavor::Current
        };

        Self {
            base_url,
            endpoint,
            timeout,
            max_retries,
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            https_only: false,
        }
    }
}

impl VerifierConfig {
    /// Full URL of the configured verification endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint.path())
    }

    /// Full URL of the health check.
    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url.trim_end_matches('/'))
    }
}

/// Verification service reached over HTTP.
pub struct HttpVerifier {
    client: Client,
    config: VerifierConfig,
}

impl HttpVerifier {
    /// Create a client with settings from the environment.
    #[instrument(level = "debug", skip_all)]
    pub fn new() -> Result<Self> {
        Self::with_config(VerifierConfig::default())
    }

    /// Create a client with custom configuration.
    #[instrument(level = "debug", skip_all, fields(
        url = %config.endpoint_url(),
        timeout_ms = config.timeout.as_millis() as u64,
        max_retries = config.max_retries
    ))]
    pub fn with_config(config: VerifierConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);
        if config.https_only {
            builder = builder
                .https_only(true)
                .min_tls_version(reqwest::tls::Version::TLS_1_3);
        }

        let client = builder.build().map_err(|e| {
            warn!(error = %e, "Failed to create HTTP client");
            CredCheckError::Config(format!("Failed to create HTTP client: {e}"))
        })?;

        info!("Verification client created");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Check `GET /api/health`.
    #[instrument(level = "debug", skip(self), fields(url = %self.config.health_url()))]
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::new(
                RemoteErrorKind::Status(status.as_u16()),
                format!("Health check returned {status}"),
            )
            .into());
        }

        response.json::<HealthStatus>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse health response");
            RemoteError::new(RemoteErrorKind::MalformedResponse, GENERIC_FAILURE_MESSAGE).into()
        })
    }

    /// Single attempt: upload, wait for the full response, interpret it.
    async fn send_once(
        &self,
        url: &str,
        document: &UploadedDocument,
    ) -> std::result::Result<Outcome, backoff::Error<CredCheckError>> {
        let start = Instant::now();

        let part = multipart::Part::bytes(document.raw_bytes().to_vec())
            .file_name(document.file_name().unwrap_or("upload").to_string())
            .mime_str(document.mime_type())
            .map_err(|e| {
                backoff::Error::permanent(CredCheckError::InvalidInput(format!(
                    "Invalid content type '{}': {e}",
                    document.mime_type()
                )))
            })?;
        let form = multipart::Form::new().part(self.config.endpoint.field_name(), part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis() as u64;
                let err = classify_transport(&e);
                if is_transient_error(&e) {
                    warn!(error = %e, kind = %err.kind, latency_ms, "Transient error, will retry");
                    backoff::Error::transient(CredCheckError::from(err))
                } else {
                    warn!(error = %e, kind = %err.kind, latency_ms, "Request failed");
                    backoff::Error::permanent(CredCheckError::from(err))
                }
            })?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        let body = response.bytes().await.map_err(|e| {
            let err = classify_transport(&e);
            warn!(error = %e, kind = %err.kind, "Failed to read response body");
            backoff::Error::permanent(CredCheckError::from(err))
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let parsed = match self.config.endpoint {
            EndpointFlavor::Current => parse_certificate_response(status.as_u16(), &body),
            EndpointFlavor::Legacy => parse_legacy_response(status.as_u16(), &body),
        };

        match parsed {
            Ok(outcome) => {
                debug!(latency_ms, "Request completed successfully");
                Ok(outcome)
            }
            Err(err) if !status.is_success() && is_transient_status(status) => {
                warn!(status = %status, latency_ms, "Transient HTTP status, will retry");
                Err(backoff::Error::transient(err))
            }
            Err(err) => {
                warn!(status = %status, kind = err.kind(), latency_ms, error = %err, "Verification rejected");
                Err(backoff::Error::permanent(err))
            }
        }
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            // None (unbounded) on overflow; the attempt cap still applies
            max_elapsed_time: self.config.timeout.checked_mul(self.config.max_retries),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VerificationService for HttpVerifier {
    #[instrument(level = "info", skip_all, fields(
        endpoint = %self.config.endpoint,
        bytes = document.size_bytes()
    ))]
    async fn verify(&self, document: &UploadedDocument) -> Result<Outcome> {
        let url = self.config.endpoint_url();
        let url = url.as_str();
        let backoff = self.build_backoff();
        let max_retries = self.config.max_retries;
        let mut attempts = 0u32;

        retry_notify(
            backoff,
            || {
                attempts += 1;
                let attempt = attempts;
                let last_attempt = attempt > max_retries;
                async move {
                    self.send_once(url, document).await.map_err(|err| match err {
                        backoff::Error::Transient { err, .. } if last_attempt => {
                            debug!(attempt, "Retry budget exhausted");
                            backoff::Error::permanent(err)
                        }
                        other => other,
                    })
                }
            },
            |err: CredCheckError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    fn endpoint(&self) -> EndpointFlavor {
        self.config.endpoint
    }
}

/// Map a reqwest failure onto a [`RemoteError`] kind.
fn classify_transport(error: &reqwest::Error) -> RemoteError {
    let kind = if error.is_timeout() {
        RemoteErrorKind::Timeout
    } else if error.is_connect() {
        RemoteErrorKind::Connect
    } else if error.is_decode() {
        RemoteErrorKind::MalformedResponse
    } else {
        RemoteErrorKind::Transport
    };
    RemoteError::new(kind, GENERIC_FAILURE_MESSAGE)
}

/// Connection failures never reached the service and are safe to retry.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_connect() && !error.is_timeout()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}
