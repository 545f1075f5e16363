//! Orchestration of one upload path.
//!
//! A [`Workflow`] pairs a [`WorkflowSession`] with the extractor for its
//! path: the remote verification service for certificates, a local QR
//! decoder for scans. Only available with the "network" feature.
//!
//! Selection and extraction are separate calls so the effects of entering
//! `Processing` (progress labels, disabled input) can be applied while the
//! extraction is still running.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::{CredCheckError, Result};
use crate::ingest::UploadedDocument;
use crate::qr::{self, QrDecoder};
use crate::remote::VerificationService;
use crate::session::{Effect, Rejected, WorkflowKind, WorkflowSession};
use crate::verdict::Outcome;

/// Produces an [`Outcome`] from an accepted document.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn kind(&self) -> WorkflowKind;

    async fn extract(&self, document: &UploadedDocument) -> Result<Outcome>;
}

/// Certificate path: one round trip to the verification service.
pub struct RemoteExtraction<V> {
    verifier: V,
}

#[async_trait]
impl<V: VerificationService> Extractor for RemoteExtraction<V> {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::Certificate
    }

    async fn extract(&self, document: &UploadedDocument) -> Result<Outcome> {
        self.verifier.verify(document).await
    }
}

/// QR path: local decode, no records lookup.
pub struct QrExtraction<D> {
    decoder: D,
}

#[async_trait]
impl<D: QrDecoder> Extractor for QrExtraction<D> {
    fn kind(&self) -> WorkflowKind {
        WorkflowKind::QrScan
    }

    async fn extract(&self, document: &UploadedDocument) -> Result<Outcome> {
        qr::scan(&self.decoder, document.pixels())
    }
}

/// A session driven end to end.
pub struct Workflow<E> {
    session: WorkflowSession,
    extractor: E,
}

impl<V: VerificationService> Workflow<RemoteExtraction<V>> {
    pub fn certificate(verifier: V) -> Self {
        Self::new(RemoteExtraction { verifier })
    }
}

impl<D: QrDecoder> Workflow<QrExtraction<D>> {
    pub fn qr_scan(decoder: D) -> Self {
        Self::new(QrExtraction { decoder })
    }
}

impl<E: Extractor> Workflow<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            session: WorkflowSession::new(extractor.kind()),
            extractor,
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// The user picked a file. Returns the effects of entering `Processing`.
    pub fn select_file(
        &mut self,
        raw_bytes: Vec<u8>,
        mime_type: &str,
        file_name: Option<String>,
    ) -> std::result::Result<Vec<Effect>, Rejected> {
        self.session.select_file(raw_bytes, mime_type, file_name)
    }

    /// Run extraction on the selected document to completion.
    ///
    /// Extraction failures do not surface as `Err`; they land in the
    /// session's `Error` state. Calling this outside `Processing` is an
    /// `InvalidTransition`.
    #[instrument(level = "info", skip(self), fields(kind = ?self.session.kind()))]
    pub async fn run(&mut self) -> Result<Vec<Effect>> {
        let document = self.session.processing_document().cloned().ok_or_else(|| {
            CredCheckError::InvalidTransition(format!(
                "run() called while {:?}",
                self.session.status()
            ))
        })?;

        let result = self.extractor.extract(&document).await;
        let effects = self.session.complete(result)?;

        info!(status = ?self.session.status(), "Extraction finished");
        Ok(effects)
    }

    /// [`select_file`](Self::select_file) then [`run`](Self::run).
    ///
    /// Returns the effects of both transitions. A rejected file returns its
    /// error and leaves the session `Idle`.
    pub async fn submit(
        &mut self,
        raw_bytes: Vec<u8>,
        mime_type: &str,
        file_name: Option<String>,
    ) -> Result<Vec<Effect>> {
        let mut effects = self.select_file(raw_bytes, mime_type, file_name)?;
        effects.extend(self.run().await?);
        Ok(effects)
    }

    pub fn reset(&mut self) -> Result<Vec<Effect>> {
        self.session.reset()
    }
}
