//! CredCheck Core - document authentication workflow
//!
//! Takes an uploaded image (a certificate photo or a QR-coded reference),
//! extracts a machine-readable signal from it, merges that with remote
//! forgery-detection and records-match results, and produces one
//! verification verdict.
//!
//! # Features
//!
//! - `network` (default): remote verification client and async [`Workflow`]
//! - `qr` (default): [`RqrrDecoder`], a real QR detector
//!
//! Without `network` the crate still provides ingestion, aggregation, the
//! session state machine and presentation, which is what the browser build
//! uses.
//!
//! # Example
//!
//! ```no_run
//! use credcheck_core::{HttpVerifier, Workflow, present};
//!
//! # async fn example() -> credcheck_core::Result<()> {
//! let bytes = std::fs::read("certificate.png").expect("readable file");
//!
//! let mut workflow = Workflow::certificate(HttpVerifier::new()?);
//! workflow.submit(bytes, "image/png", Some("certificate.png".into())).await?;
//!
//! let view = present(workflow.session());
//! println!("{}", view.headline);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extraction;
pub mod ingest;
pub mod presentation;
pub mod qr;
pub mod remote;
pub mod session;
pub mod verdict;
#[cfg(feature = "network")]
pub mod workflow;

// Re-export main types for convenience
pub use error::{CredCheckError, RemoteError, RemoteErrorKind, Result, GENERIC_FAILURE_MESSAGE};
pub use extraction::{DatabaseMatch, ExtractionResult, ForgeryAssessment, OcrFields};
pub use ingest::{
    ingest, mime_from_path, PixelBuffer, UploadPolicy, UploadedDocument, MAX_UPLOAD_SIZE,
};
pub use presentation::{present, present_outcome, DisplayModel, ScoreBand, ScoreDisplay, Tone};
pub use qr::{decode_qr, FixtureDecoder, QrDecoder, NO_QR_FOUND_MESSAGE};
pub use remote::{parse_certificate_response, parse_legacy_response, EndpointFlavor};
pub use session::{
    Effect, Rejected, SessionStatus, VerificationStage, WorkflowKind, WorkflowSession,
    WorkflowState,
};
pub use verdict::{aggregate, Outcome, ScoreValue, VerdictStatus, VerificationVerdict};

#[cfg(feature = "qr")]
pub use qr::RqrrDecoder;

// Network-dependent exports (not available in Wasm)
#[cfg(feature = "network")]
pub use remote::{HttpVerifier, VerificationService, VerifierConfig};
#[cfg(feature = "network")]
pub use workflow::{Extractor, QrExtraction, RemoteExtraction, Workflow};
