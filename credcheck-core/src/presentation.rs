//! Maps session state and verdicts to display data.
//!
//! Nothing here decides authenticity; it only reads what the aggregator
//! produced. Percent scores get a colored band (`>80` green, `>60` amber,
//! otherwise red); boolean scores render as a check.

use serde::Serialize;

use crate::extraction::{ExtractionResult, ForgeryAssessment};
use crate::session::{SessionStatus, WorkflowKind, WorkflowSession};
use crate::verdict::{Outcome, ScoreValue, VerdictStatus};

/// Shown for fields the extractor did not recover.
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Busy,
    Positive,
    Warning,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Green,
    Amber,
    Red,
}

impl ScoreBand {
    pub fn for_percent(percent: f64) -> Self {
        if percent > 80.0 {
            Self::Green
        } else if percent > 60.0 {
            Self::Amber
        } else {
            Self::Red
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreDisplay {
    Check { passed: bool },
    Bar { percent: f64, band: ScoreBand },
}

impl From<ScoreValue> for ScoreDisplay {
    fn from(value: ScoreValue) -> Self {
        match value {
            ScoreValue::Check(passed) => Self::Check { passed },
            ScoreValue::Percent(percent) => Self::Bar {
                percent,
                band: ScoreBand::for_percent(percent),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub key: String,
    pub label: String,
    pub display: ScoreDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    pub label: &'static str,
    pub value: String,
}

impl FieldRow {
    fn new(label: &'static str, value: Option<&str>) -> Self {
        Self {
            label,
            value: value.unwrap_or(NOT_FOUND).to_string(),
        }
    }
}

/// Everything a front end needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayModel {
    pub status: SessionStatus,
    pub tone: Tone,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub progress: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extracted: Vec<FieldRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_record: Vec<FieldRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forgery: Vec<FieldRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ScoreRow>,
    pub can_select_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
}

impl DisplayModel {
    fn empty(status: SessionStatus, tone: Tone, headline: impl Into<String>) -> Self {
        Self {
            status,
            tone,
            headline: headline.into(),
            message: None,
            progress: Vec::new(),
            extracted: Vec::new(),
            matched_record: Vec::new(),
            forgery: Vec::new(),
            overall_confidence: None,
            scores: Vec::new(),
            can_select_file: status != SessionStatus::Processing,
            action: None,
        }
    }
}

/// Render the whole session.
pub fn present(session: &WorkflowSession) -> DisplayModel {
    let kind = session.kind();
    match session.status() {
        SessionStatus::Idle => {
            let mut model = DisplayModel::empty(SessionStatus::Idle, Tone::Neutral, idle_headline(kind));
            if let Some(error) = session.inline_error() {
                model.tone = Tone::Negative;
                model.message = Some(error.to_string());
            }
            model
        }
        SessionStatus::Processing => {
            let mut model =
                DisplayModel::empty(SessionStatus::Processing, Tone::Busy, "Processing...");
            model.progress = kind.stages().iter().map(|s| s.label()).collect();
            model
        }
        SessionStatus::Success => match session.outcome() {
            Some(outcome) => present_outcome(kind, outcome),
            None => DisplayModel::empty(SessionStatus::Success, Tone::Neutral, ""),
        },
        SessionStatus::Error => {
            let headline = match kind {
                WorkflowKind::Certificate => "Verification Failed",
                WorkflowKind::QrScan => "Scan Failed. Try Again.",
            };
            let mut model = DisplayModel::empty(SessionStatus::Error, Tone::Negative, headline);
            model.message = session.failure().map(|f| f.user_message());
            model.action = Some(retry_action(kind));
            model
        }
    }
}

/// Render a successful outcome.
pub fn present_outcome(kind: WorkflowKind, outcome: &Outcome) -> DisplayModel {
    let verdict = outcome.verdict();

    let (tone, headline) = match (outcome.extraction(), verdict.status()) {
        (ExtractionResult::Qr { .. }, _) => (Tone::Positive, "QR Code Scanned Successfully!"),
        (_, VerdictStatus::Verified) => (Tone::Positive, "Certificate Verified"),
        (_, VerdictStatus::Suspicious) => (Tone::Warning, "Suspicious Document"),
        (_, VerdictStatus::Invalid) => (Tone::Negative, "Invalid Certificate"),
    };

    let mut model = DisplayModel::empty(SessionStatus::Success, tone, headline);
    model.message = verdict.details().map(str::to_string);
    model.overall_confidence = verdict.overall_confidence();
    model.action = Some(retry_action(kind));

    match outcome.extraction() {
        ExtractionResult::Qr { payload } => {
            model.extracted = vec![FieldRow::new("Payload", Some(payload))];
        }
        ExtractionResult::Ocr(fields) => {
            model.extracted = vec![
                FieldRow::new("Certificate No", fields.certificate_no.as_deref()),
                FieldRow::new("Name", fields.name.as_deref()),
                FieldRow::new("Institution", fields.institution.as_deref()),
                FieldRow::new("Course", fields.course.as_deref()),
                FieldRow::new("Year", fields.year.as_deref()),
            ];
        }
        ExtractionResult::Legacy { .. } | ExtractionResult::None => {}
    }

    if let Some(record) = outcome.database_match() {
        model.matched_record = vec![
            FieldRow::new("Certificate No", Some(&record.certificate_no)),
            FieldRow::new("Name", Some(&record.name)),
            FieldRow::new("Institution", Some(&record.institution)),
            FieldRow::new("Course", Some(&record.course)),
        ];
        if let Some(year) = record.year.as_deref() {
            model.matched_record.push(FieldRow::new("Year", Some(year)));
        }
    }

    if let Some(forgery) = outcome.forgery() {
        model.forgery = forgery_rows(forgery);
    }

    model.scores = verdict
        .confidence_scores()
        .iter()
        .map(|(key, value)| ScoreRow {
            key: key.clone(),
            label: humanize(key),
            display: (*value).into(),
        })
        .collect();

    model
}

fn forgery_rows(forgery: &ForgeryAssessment) -> Vec<FieldRow> {
    let thresholds = forgery.thresholds;
    let mut rows = Vec::new();
    if let Some(institution) = forgery.institution.as_deref() {
        let value = match forgery.institution_code.as_deref() {
            Some(code) => format!("{institution} ({code})"),
            None => institution.to_string(),
        };
        rows.push(FieldRow {
            label: "Reference institution",
            value,
        });
    }
    rows.push(FieldRow {
        label: "Seal",
        value: check_summary(
            forgery.seal_authentic,
            forgery.seal_match_score,
            thresholds.map(|t| t.seal),
        ),
    });
    rows.push(FieldRow {
        label: "Signature",
        value: check_summary(
            forgery.signature_authentic,
            forgery.signature_match_score,
            thresholds.map(|t| t.signature),
        ),
    });
    rows.push(FieldRow {
        label: "Overall",
        value: if forgery.overall_authentic {
            "Authentic".to_string()
        } else {
            "Possible forgery".to_string()
        },
    });
    rows
}

fn check_summary(authentic: bool, score: f64, threshold: Option<f64>) -> String {
    let verdict = if authentic { "Authentic" } else { "Mismatch" };
    match threshold {
        Some(t) => format!(
            "{verdict}, {:.0}% match (threshold {:.0}%)",
            score * 100.0,
            t * 100.0
        ),
        None => format!("{verdict}, {:.0}% match", score * 100.0),
    }
}

fn idle_headline(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Certificate => "Upload a certificate to verify",
        WorkflowKind::QrScan => "Upload an image containing a QR code",
    }
}

fn retry_action(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Certificate => "Verify another document",
        WorkflowKind::QrScan => "Scan again",
    }
}

/// `ocr_quality` -> `Ocr quality`.
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
