//! Wire formats of the verification service.
//!
//! Parsing lives here, independent of the HTTP client, so a browser build
//! that performs the request itself can still turn the response into an
//! [`Outcome`].

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CredCheckError, RemoteError, RemoteErrorKind, Result, GENERIC_FAILURE_MESSAGE};
use crate::extraction::{
    de_opt_stringish, parse_timestamp, recovered, DatabaseMatch, ExtractionResult,
    ForgeryAssessment, OcrFields,
};
use crate::verdict::{Outcome, ScoreValue, ValidationSignals};

/// Body of `POST /api/verify-certificate`.
#[derive(Debug, Deserialize)]
pub struct CertificateResponse {
    /// Absent means the body is malformed.
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub extracted_info: Option<ExtractedInfo>,
    #[serde(default)]
    pub forgery_detection: Option<ForgeryAssessment>,
    #[serde(default)]
    pub validation: Option<ValidationBlock>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub certificate_no: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub institution: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub course: Option<String>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub year: Option<String>,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub processing_timestamp: Option<String>,
}

impl From<ExtractedInfo> for OcrFields {
    fn from(info: ExtractedInfo) -> Self {
        let timestamp_utc = info.processing_timestamp.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warn!(raw, "Unparseable processing timestamp");
            }
            parsed
        });
        Self {
            certificate_no: recovered(info.certificate_no),
            name: recovered(info.name),
            institution: recovered(info.institution),
            course: recovered(info.course),
            year: recovered(info.year),
            raw_text: info.raw_text,
            timestamp_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidationBlock {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub overall_confidence: Option<f64>,
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, ScoreValue>,
    #[serde(default)]
    pub matched_record: Option<DatabaseMatch>,
}

/// Body of the legacy `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct LegacyResponse {
    pub status: String,
    #[serde(default)]
    pub details: String,
}

/// Error body of a non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl CertificateResponse {
    /// Turn a 2xx body into an [`Outcome`].
    ///
    /// `success: false` is an extraction failure, not a transport problem.
    pub fn into_outcome(self) -> Result<Outcome> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            return Err(CredCheckError::ExtractionFailure(message));
        }

        let extraction = match self.extracted_info {
            Some(info) => ExtractionResult::Ocr(info.into()),
            None => ExtractionResult::None,
        };
        let validation = self.validation.unwrap_or_default();
        debug!(
            remote_status = validation.status.as_deref().unwrap_or("-"),
            remote_is_valid = validation.is_valid,
            "Parsed verification response"
        );

        let signals = ValidationSignals {
            overall_confidence: validation.overall_confidence,
            confidence_scores: validation.confidence_scores,
        };

        Ok(Outcome::from_parts(
            extraction,
            self.forgery_detection,
            validation.matched_record,
            &signals,
        ))
    }
}

impl LegacyResponse {
    pub fn into_outcome(self) -> Outcome {
        Outcome::legacy(&self.status, &self.details)
    }
}

/// Message for a non-2xx response: the server's `error` field when present.
pub fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

fn malformed(err: serde_json::Error) -> CredCheckError {
    warn!(error = %err, "Malformed verification response");
    RemoteError::new(RemoteErrorKind::MalformedResponse, GENERIC_FAILURE_MESSAGE).into()
}

/// Interpret a completed `/api/verify-certificate` exchange.
pub fn parse_certificate_response(status: u16, body: &[u8]) -> Result<Outcome> {
    if !(200..300).contains(&status) {
        return Err(RemoteError::new(RemoteErrorKind::Status(status), error_message(body)).into());
    }
    serde_json::from_slice::<CertificateResponse>(body)
        .map_err(malformed)?
        .into_outcome()
}

/// Interpret a completed legacy `/verify` exchange.
pub fn parse_legacy_response(status: u16, body: &[u8]) -> Result<Outcome> {
    if !(200..300).contains(&status) {
        return Err(RemoteError::new(RemoteErrorKind::Status(status), error_message(body)).into());
    }
    Ok(serde_json::from_slice::<LegacyResponse>(body)
        .map_err(malformed)?
        .into_outcome())
}
