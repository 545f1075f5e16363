//! Remote OCR / forgery-detection / records verification.
//!
//! The service is an external collaborator behind a request/response
//! boundary. Two contracts exist:
//!
//! - **Current** - `POST /api/verify-certificate`, multipart field `file`,
//!   structured extraction + forgery + validation JSON
//! - **Legacy** - `POST /verify`, multipart field `document`,
//!   `{status, details}`
//!
//! A client speaks exactly one of them, chosen by configuration.

pub mod wire;

#[cfg(feature = "network")]
mod client;

#[cfg(feature = "network")]
pub use client::{is_transient_error, is_transient_status, HttpVerifier, VerifierConfig};
pub use wire::{
    parse_certificate_response, parse_legacy_response, CertificateResponse, HealthStatus,
    LegacyResponse,
};

#[cfg(feature = "network")]
use async_trait::async_trait;

#[cfg(feature = "network")]
use crate::{error::Result, ingest::UploadedDocument, verdict::Outcome};

/// Which endpoint contract a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointFlavor {
    #[default]
    Current,
    Legacy,
}

impl EndpointFlavor {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Current => "/api/verify-certificate",
            Self::Legacy => "/verify",
        }
    }

    /// Multipart field carrying the file.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Current => "file",
            Self::Legacy => "document",
        }
    }
}

impl std::fmt::Display for EndpointFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Trait for remote verification services.
///
/// One call is one network round trip; the upload, OCR and validation
/// stages happen server-side and are only labels on the client.
/// Implementations must be thread-safe (`Send + Sync`).
#[cfg(feature = "network")]
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Submit the document and interpret the service's answer.
    ///
    /// Fails with `Remote` for transport/status/format problems and with
    /// `ExtractionFailure` when the service reports `success: false`.
    async fn verify(&self, document: &UploadedDocument) -> Result<Outcome>;

    fn endpoint(&self) -> EndpointFlavor;
}
