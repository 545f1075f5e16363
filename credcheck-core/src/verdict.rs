//! Result aggregation.
//!
//! A [`VerificationVerdict`] is always derived from extraction output plus
//! the optional forgery assessment and database match; its fields are
//! private so nothing downstream can hand-build one.
//!
//! Status policy:
//! - `INVALID` when extraction failed or recovered no identifying field
//! - `VERIFIED` when a database match exists and the forgery check did not
//!   flag the document (an absent assessment is not disqualifying)
//! - `SUSPICIOUS` otherwise
//!
//! A legacy report has no fields to check; its reported classification is
//! mapped onto the same three statuses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extraction::{DatabaseMatch, ExtractionResult, ForgeryAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Verified,
    Suspicious,
    Invalid,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "VERIFIED"),
            Self::Suspicious => write!(f, "SUSPICIOUS"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

/// One confidence entry. The original JSON type is preserved so a boolean
/// renders as a check and a number as a percentage bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Check(bool),
    Percent(f64),
}

/// Confidence figures reported by the service, carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSignals {
    pub overall_confidence: Option<f64>,
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, ScoreValue>,
}

/// Final authenticity classification for one submitted document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationVerdict {
    status: VerdictStatus,
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    overall_confidence: Option<f64>,
    confidence_scores: BTreeMap<String, ScoreValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl VerificationVerdict {
    pub fn status(&self) -> VerdictStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Overall confidence in `[0, 100]`, only when the service reported one.
    pub fn overall_confidence(&self) -> Option<f64> {
        self.overall_confidence
    }

    pub fn confidence_scores(&self) -> &BTreeMap<String, ScoreValue> {
        &self.confidence_scores
    }

    /// Free-text explanation (legacy endpoint only).
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

/// Map a legacy `/verify` classification onto a status.
fn legacy_status(reported: &str) -> VerdictStatus {
    match reported.trim().to_ascii_lowercase().as_str() {
        "verified" | "valid" | "authentic" => VerdictStatus::Verified,
        "invalid" | "fake" | "forged" => VerdictStatus::Invalid,
        _ => VerdictStatus::Suspicious,
    }
}

/// Apply the status policy.
pub fn derive_status(
    extraction: &ExtractionResult,
    forgery: Option<&ForgeryAssessment>,
    database_match: Option<&DatabaseMatch>,
) -> VerdictStatus {
    if let ExtractionResult::Legacy { status, .. } = extraction {
        return legacy_status(status);
    }
    if extraction.identifier().is_none() {
        return VerdictStatus::Invalid;
    }
    let authentic = forgery.map_or(true, |f| f.overall_authentic);
    if database_match.is_some() && authentic {
        VerdictStatus::Verified
    } else {
        VerdictStatus::Suspicious
    }
}

/// Merge extraction output, forgery assessment and database match into a verdict.
///
/// Deterministic: identical inputs always produce an identical verdict.
pub fn aggregate(
    extraction: &ExtractionResult,
    forgery: Option<&ForgeryAssessment>,
    database_match: Option<&DatabaseMatch>,
    signals: &ValidationSignals,
) -> VerificationVerdict {
    let status = derive_status(extraction, forgery, database_match);
    let details = match extraction {
        ExtractionResult::Legacy { details, .. } => {
            Some(details.clone()).filter(|d| !d.trim().is_empty())
        }
        _ => None,
    };
    VerificationVerdict {
        status,
        is_valid: status == VerdictStatus::Verified,
        overall_confidence: signals.overall_confidence,
        confidence_scores: signals.confidence_scores.clone(),
        details,
    }
}

/// Everything a successful extraction produced: the session's success payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    extraction: ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    forgery: Option<ForgeryAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_match: Option<DatabaseMatch>,
    verdict: VerificationVerdict,
}

impl Outcome {
    /// Aggregate the parts and keep them alongside the verdict.
    pub fn from_parts(
        extraction: ExtractionResult,
        forgery: Option<ForgeryAssessment>,
        database_match: Option<DatabaseMatch>,
        signals: &ValidationSignals,
    ) -> Self {
        let verdict = aggregate(
            &extraction,
            forgery.as_ref(),
            database_match.as_ref(),
            signals,
        );
        Self {
            extraction,
            forgery,
            database_match,
            verdict,
        }
    }

    /// Outcome of a successful QR scan. No records lookup happens on this path.
    pub fn scanned(payload: impl Into<String>) -> Self {
        Self::from_parts(
            ExtractionResult::Qr {
                payload: payload.into(),
            },
            None,
            None,
            &ValidationSignals::default(),
        )
    }

    /// Outcome of the legacy `/verify` contract.
    pub fn legacy(status: &str, details: &str) -> Self {
        Self::from_parts(
            ExtractionResult::Legacy {
                status: status.to_string(),
                details: details.to_string(),
            },
            None,
            None,
            &ValidationSignals::default(),
        )
    }

    pub fn extraction(&self) -> &ExtractionResult {
        &self.extraction
    }

    pub fn forgery(&self) -> Option<&ForgeryAssessment> {
        self.forgery.as_ref()
    }

    pub fn database_match(&self) -> Option<&DatabaseMatch> {
        self.database_match.as_ref()
    }

    pub fn verdict(&self) -> &VerificationVerdict {
        &self.verdict
    }
}
