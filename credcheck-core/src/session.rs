//! Verification state machine.
//!
//! ```text
//! Idle --select_file(valid)--> Processing --complete(Ok)--> Success
//!                                         --complete(Err)-> Error
//! Success | Error --reset--> Idle
//! ```
//!
//! A session owns at most one document, one in-flight extraction and one
//! outcome. File selection and reset are refused while `Processing`; a new
//! selection from `Success`/`Error` replaces the whole state at once.
//! Presentation side effects are returned as [`Effect`]s rather than
//! performed here.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CredCheckError, Result};
use crate::ingest::{ingest, UploadPolicy, UploadedDocument};
use crate::verdict::Outcome;

/// Which upload path the session serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Certificate photo sent to the remote OCR/verification service.
    Certificate,
    /// QR image decoded locally.
    QrScan,
}

impl WorkflowKind {
    pub fn policy(&self) -> UploadPolicy {
        match self {
            Self::Certificate => UploadPolicy::certificate(),
            Self::QrScan => UploadPolicy::qr_scan(),
        }
    }

    /// Progress labels shown while `Processing`.
    pub fn stages(&self) -> &'static [VerificationStage] {
        match self {
            Self::Certificate => &[
                VerificationStage::Uploading,
                VerificationStage::ExtractingText,
                VerificationStage::Validating,
            ],
            Self::QrScan => &[VerificationStage::DecodingQr],
        }
    }
}

/// Progress label. The certificate stages all happen inside one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    Uploading,
    ExtractingText,
    Validating,
    DecodingQr,
}

impl VerificationStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uploading => "Uploading document...",
            Self::ExtractingText => "Extracting text with OCR...",
            Self::Validating => "Validating against records and checking for forgery...",
            Self::DecodingQr => "Scanning QR code...",
        }
    }
}

/// Presentation instruction emitted by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum Effect {
    DisableFileInput,
    EnableFileInput,
    /// Forget the previously chosen file in the picker.
    ClearFileInput,
    ShowInlineError(String),
    ClearInlineError,
    ShowProgress(Vec<VerificationStage>),
    ScrollToResult,
    ScrollToTop,
}

/// A refused file selection and the effects that surface it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: CredCheckError,
    pub effects: Vec<Effect>,
}

impl From<Rejected> for CredCheckError {
    fn from(rejected: Rejected) -> Self {
        rejected.error
    }
}

/// Coarse state, for callers that only need the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Processing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Processing {
        document: UploadedDocument,
    },
    Success {
        document: UploadedDocument,
        outcome: Outcome,
    },
    Error {
        document: UploadedDocument,
        failure: CredCheckError,
    },
}

/// Root aggregate of one verification attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSession {
    kind: WorkflowKind,
    state: WorkflowState,
    inline_error: Option<String>,
    /// Bumped whenever the state is replaced wholesale (new file or reset).
    generation: u64,
}

impl WorkflowSession {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            state: WorkflowState::Idle,
            inline_error: None,
            generation: 0,
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            WorkflowState::Idle => SessionStatus::Idle,
            WorkflowState::Processing { .. } => SessionStatus::Processing,
            WorkflowState::Success { .. } => SessionStatus::Success,
            WorkflowState::Error { .. } => SessionStatus::Error,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Validation message from the last rejected selection.
    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        match &self.state {
            WorkflowState::Idle => None,
            WorkflowState::Processing { document }
            | WorkflowState::Success { document, .. }
            | WorkflowState::Error { document, .. } => Some(document),
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            WorkflowState::Success { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&CredCheckError> {
        match &self.state {
            WorkflowState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// File picking is disabled while a verification is in flight.
    pub fn can_select_file(&self) -> bool {
        self.status() != SessionStatus::Processing
    }

    pub fn can_reset(&self) -> bool {
        matches!(self.status(), SessionStatus::Success | SessionStatus::Error)
    }

    /// The user picked a file.
    ///
    /// Any previous document, outcome or failure is discarded first. A valid
    /// image moves the session to `Processing`; an invalid one leaves it
    /// `Idle` and is rejected with `InvalidInput` and a
    /// [`Effect::ShowInlineError`].
    pub fn select_file(
        &mut self,
        raw_bytes: Vec<u8>,
        mime_type: &str,
        file_name: Option<String>,
    ) -> std::result::Result<Vec<Effect>, Rejected> {
        if !self.can_select_file() {
            warn!(generation = self.generation, "File selected while processing");
            return Err(Rejected {
                error: CredCheckError::SessionBusy,
                effects: Vec::new(),
            });
        }

        self.clear();

        match ingest(raw_bytes, mime_type, file_name, &self.kind.policy()) {
            Ok(document) => {
                info!(
                    generation = self.generation,
                    kind = ?self.kind,
                    bytes = document.size_bytes(),
                    mime_type = document.mime_type(),
                    "Processing started"
                );
                self.state = WorkflowState::Processing { document };
                Ok(vec![
                    Effect::ClearInlineError,
                    Effect::DisableFileInput,
                    Effect::ShowProgress(self.kind.stages().to_vec()),
                ])
            }
            Err(error) => {
                warn!(generation = self.generation, error = %error, "Upload rejected");
                let message = error.user_message();
                self.inline_error = Some(message.clone());
                Err(Rejected {
                    error,
                    effects: vec![Effect::ClearFileInput, Effect::ShowInlineError(message)],
                })
            }
        }
    }

    /// The document being processed, if the session is `Processing`.
    pub fn processing_document(&self) -> Option<&UploadedDocument> {
        match &self.state {
            WorkflowState::Processing { document } => Some(document),
            _ => None,
        }
    }

    /// The in-flight extraction finished.
    pub fn complete(&mut self, result: Result<Outcome>) -> Result<Vec<Effect>> {
        let document = match std::mem::replace(&mut self.state, WorkflowState::Idle) {
            WorkflowState::Processing { document } => document,
            other => {
                self.state = other;
                return Err(CredCheckError::InvalidTransition(format!(
                    "complete() called while {:?}",
                    self.status()
                )));
            }
        };

        self.state = match result {
            Ok(outcome) => {
                info!(
                    generation = self.generation,
                    status = %outcome.verdict().status(),
                    confidence = outcome.verdict().overall_confidence(),
                    "Verification succeeded"
                );
                WorkflowState::Success { document, outcome }
            }
            Err(failure) => {
                match &failure {
                    CredCheckError::Remote(remote) => warn!(
                        generation = self.generation,
                        kind = %remote.kind,
                        status = remote.status(),
                        message = %remote.message,
                        "Verification failed: remote error"
                    ),
                    other => warn!(
                        generation = self.generation,
                        kind = other.kind(),
                        error = %other,
                        "Verification failed"
                    ),
                }
                WorkflowState::Error { document, failure }
            }
        };

        Ok(vec![Effect::EnableFileInput, Effect::ScrollToResult])
    }

    /// "Try again" / "Scan again". Idempotent from `Idle`.
    pub fn reset(&mut self) -> Result<Vec<Effect>> {
        match self.status() {
            SessionStatus::Processing => {
                warn!(generation = self.generation, "Reset requested while processing");
                Err(CredCheckError::SessionBusy)
            }
            SessionStatus::Idle => {
                self.inline_error = None;
                Ok(vec![Effect::ClearInlineError])
            }
            SessionStatus::Success | SessionStatus::Error => {
                self.clear();
                info!(generation = self.generation, "Session reset");
                Ok(vec![Effect::ClearFileInput, Effect::ScrollToTop])
            }
        }
    }

    /// Drop every trace of the previous attempt.
    fn clear(&mut self) {
        self.state = WorkflowState::Idle;
        self.inline_error = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, RemoteErrorKind};
    use crate::extraction::{DatabaseMatch, ExtractionResult, OcrFields};
    use crate::ingest::tests::png_bytes;
    use crate::ingest::MAX_UPLOAD_SIZE;
    use crate::verdict::{ValidationSignals, VerdictStatus};

    fn verified() -> Outcome {
        Outcome::from_parts(
            ExtractionResult::Ocr(OcrFields::with_certificate_no("JH-UNI-2018-201")),
            None,
            Some(DatabaseMatch {
                certificate_no: "JH-UNI-2018-201".into(),
                name: "Asha Kumari".into(),
                institution: "Jharkhand State University".into(),
                course: "BBA".into(),
                year: None,
            }),
            &ValidationSignals::default(),
        )
    }

    fn processing(kind: WorkflowKind) -> WorkflowSession {
        let mut session = WorkflowSession::new(kind);
        session
            .select_file(png_bytes(8, 8), "image/png", Some("cert.png".into()))
            .unwrap();
        session
    }

    #[test]
    fn test_valid_selection_enters_processing() {
        let mut session = WorkflowSession::new(WorkflowKind::Certificate);
        let effects = session
            .select_file(png_bytes(8, 8), "image/png", None)
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Processing);
        assert!(!session.can_select_file());
        assert!(effects.contains(&Effect::DisableFileInput));
        assert!(effects.contains(&Effect::ShowProgress(vec![
            VerificationStage::Uploading,
            VerificationStage::ExtractingText,
            VerificationStage::Validating,
        ])));
    }

    #[test]
    fn test_wrong_mime_stays_idle_with_inline_error() {
        let mut session = WorkflowSession::new(WorkflowKind::Certificate);
        let rejected = session
            .select_file(b"%PDF-1.7".to_vec(), "application/pdf", None)
            .unwrap_err();

        assert!(matches!(rejected.error, CredCheckError::InvalidInput(_)));
        assert_eq!(session.status(), SessionStatus::Idle);
        let message = session.inline_error().unwrap().to_string();
        assert!(message.contains("Unsupported file type"));
        assert!(rejected.effects.contains(&Effect::ShowInlineError(message)));
        assert!(session.document().is_none());
    }

    #[test]
    fn test_oversize_stays_idle() {
        let mut session = WorkflowSession::new(WorkflowKind::QrScan);
        let rejected = session
            .select_file(vec![0u8; MAX_UPLOAD_SIZE + 1], "image/png", None)
            .unwrap_err();

        assert!(matches!(rejected.error, CredCheckError::InvalidInput(_)));
        assert!(matches!(
            rejected.effects.last(),
            Some(Effect::ShowInlineError(message)) if message.contains("File too large")
        ));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_selection_refused_while_processing() {
        let mut session = processing(WorkflowKind::Certificate);
        let before = session.clone();

        let rejected = session
            .select_file(png_bytes(4, 4), "image/png", None)
            .unwrap_err();

        assert_eq!(rejected.error, CredCheckError::SessionBusy);
        assert!(rejected.effects.is_empty());
        assert_eq!(session, before);
    }

    #[test]
    fn test_reset_refused_while_processing() {
        let mut session = processing(WorkflowKind::Certificate);
        assert_eq!(session.reset().unwrap_err(), CredCheckError::SessionBusy);
        assert_eq!(session.status(), SessionStatus::Processing);
    }

    #[test]
    fn test_success_stores_outcome() {
        let mut session = processing(WorkflowKind::Certificate);
        let effects = session.complete(Ok(verified())).unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(
            session.outcome().unwrap().verdict().status(),
            VerdictStatus::Verified
        );
        assert_eq!(effects, vec![Effect::EnableFileInput, Effect::ScrollToResult]);
    }

    #[test]
    fn test_failure_stores_reason() {
        let mut session = processing(WorkflowKind::Certificate);
        session
            .complete(Err(RemoteError::new(RemoteErrorKind::Status(500), "boom").into()))
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.failure().unwrap().user_message(), "boom");
        assert!(session.outcome().is_none());
    }

    #[test]
    fn test_complete_outside_processing_is_rejected() {
        let mut session = WorkflowSession::new(WorkflowKind::Certificate);
        assert!(matches!(
            session.complete(Ok(verified())),
            Err(CredCheckError::InvalidTransition(_))
        ));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_reset_clears_everything() {
        for result in [
            Ok(verified()),
            Err(CredCheckError::ExtractionFailure("No QR code found".into())),
        ] {
            let mut session = processing(WorkflowKind::Certificate);
            session.complete(result).unwrap();

            let effects = session.reset().unwrap();
            assert_eq!(session.status(), SessionStatus::Idle);
            assert!(session.document().is_none());
            assert!(session.outcome().is_none());
            assert!(session.failure().is_none());
            assert!(session.inline_error().is_none());
            assert!(effects.contains(&Effect::ClearFileInput));

            // Idempotent
            session.reset().unwrap();
            assert_eq!(session.status(), SessionStatus::Idle);
            assert_eq!(*session.state(), WorkflowState::Idle);
        }
    }

    #[test]
    fn test_new_selection_replaces_previous_attempt() {
        let mut session = processing(WorkflowKind::Certificate);
        session.complete(Ok(verified())).unwrap();
        let generation = session.generation();

        session
            .select_file(png_bytes(2, 2), "image/png", Some("second.png".into()))
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Processing);
        assert!(session.outcome().is_none());
        assert_eq!(session.document().unwrap().file_name(), Some("second.png"));
        assert!(session.generation() > generation);
    }

    #[test]
    fn test_invalid_selection_after_success_drops_old_outcome() {
        let mut session = processing(WorkflowKind::Certificate);
        session.complete(Ok(verified())).unwrap();

        assert!(session
            .select_file(b"hello".to_vec(), "text/plain", None)
            .is_err());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.outcome().is_none());
        assert!(session.document().is_none());
    }
}
