//! Extraction output and the remote assessment records that accompany it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Values the verification service emits for fields it could not recover.
const PLACEHOLDERS: &[&str] = &["-", "not found", "none", "null"];

/// What came out of one submitted document. Produced exactly once per submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionResult {
    /// Payload of the first QR code found in the image.
    Qr { payload: String },
    /// Structured OCR output from the verification service.
    Ocr(OcrFields),
    /// Classification reported by the legacy `/verify` contract, which
    /// returns no extracted fields.
    Legacy { status: String, details: String },
    /// Extraction failed.
    None,
}

impl ExtractionResult {
    /// The identifying value recovered from the document, if any.
    ///
    /// OCR results are identified by certificate number, falling back to the
    /// holder's name; a QR result by its (non-blank) payload. A legacy report
    /// carries no identifier.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Qr { payload } => Some(payload.trim()).filter(|p| !p.is_empty()),
            Self::Ocr(fields) => fields
                .certificate_no
                .as_deref()
                .or(fields.name.as_deref()),
            Self::Legacy { .. } | Self::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Structured certificate fields recovered by OCR.
///
/// Every optional field is `None` when the service could not recover it,
/// including when it sent a placeholder such as `"Not found"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrFields {
    pub certificate_no: Option<String>,
    pub name: Option<String>,
    pub institution: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub raw_text: String,
    pub timestamp_utc: Option<DateTime<Utc>>,
}

impl OcrFields {
    #[cfg(test)]
    pub(crate) fn with_certificate_no(certificate_no: impl Into<String>) -> Self {
        Self {
            certificate_no: recovered(Some(certificate_no.into())),
            ..Default::default()
        }
    }
}

/// Remote forgery-detection result for the seal and signature regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeryAssessment {
    pub seal_authentic: bool,
    /// Match score in `[0, 1]`.
    pub seal_match_score: f64,
    pub signature_authentic: bool,
    /// Match score in `[0, 1]`.
    pub signature_match_score: f64,
    pub overall_authentic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ForgeryThresholds>,
}

/// Minimum match scores the detector applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForgeryThresholds {
    pub seal: f64,
    pub signature: f64,
}

/// A records-store hit keyed by the extracted certificate identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMatch {
    pub certificate_no: String,
    pub name: String,
    pub institution: String,
    #[serde(default)]
    pub course: String,
    #[serde(
        default,
        deserialize_with = "de_opt_stringish",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
}

/// Drop blanks and the service's "not recovered" placeholders.
pub fn recovered(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| {
            let lower = v.to_ascii_lowercase();
            !PLACEHOLDERS.contains(&lower.as_str())
        })
}

/// Parse the service's processing timestamp.
///
/// Accepts RFC 3339 or a naive ISO-8601 timestamp (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Accept a JSON string or number where a string is expected (years come
/// back as integers from some record stores).
pub(crate) fn de_opt_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stringish {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(
        Option::<Stringish>::deserialize(deserializer)?.map(|value| match value {
            Stringish::Text(s) => s,
            Stringish::Int(i) => i.to_string(),
            Stringish::Float(f) => f.to_string(),
        }),
    )
}
