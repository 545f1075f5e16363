//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell a forged certificate (65) from an unreachable
//! verification service (69) without parsing output.

use credcheck_core::{CredCheckError, Effect, Rejected, VerdictStatus};

/// Verified certificate, or a QR code was read.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Document not authentic, or nothing could be extracted from it.
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Input file missing, unreadable, of the wrong type or too large.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Verification service unreachable or misbehaving.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

pub const HELP: &str = "\
Exit codes:
  0   Certificate verified / QR code scanned
  64  Usage error
  65  Document SUSPICIOUS or INVALID, or nothing extracted
  66  Input file unreadable, wrong type or larger than 10 MB
  69  Verification service unavailable
  1   Other error";

/// The verdict was produced but is not `VERIFIED`.
#[derive(Debug, thiserror::Error)]
#[error("Document is {0}")]
pub struct NotAuthentic(pub VerdictStatus);

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        // A rejected upload has already been shown as an inline error.
        if let Some(rejected) = err.downcast_ref::<Rejected>() {
            let shown = rejected
                .effects
                .iter()
                .any(|e| matches!(e, Effect::ShowInlineError(_)));
            return Self {
                code: Self::for_core_error(&rejected.error),
                message: (!shown).then(|| format!("{err:#}")),
            };
        }

        let message = format!("{err:#}");

        let code = if err.downcast_ref::<NotAuthentic>().is_some() {
            VERIFICATION_FAILED
        } else if let Some(err) = err.downcast_ref::<CredCheckError>() {
            Self::for_core_error(err)
        } else if err.downcast_ref::<std::io::Error>().is_some() {
            INPUT_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }

    fn for_core_error(err: &CredCheckError) -> i32 {
        match err {
            CredCheckError::InvalidInput(_) => INPUT_ERROR,
            CredCheckError::ExtractionFailure(_) => VERIFICATION_FAILED,
            CredCheckError::Remote(_) => NETWORK_ERROR,
            CredCheckError::Config(_) => USAGE_ERROR,
            CredCheckError::SessionBusy | CredCheckError::InvalidTransition(_) => GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use credcheck_core::RemoteError;

    use super::*;

    fn code_of(err: anyhow::Error) -> i32 {
        ExitCode::from_anyhow(&err).code
    }

    #[test]
    fn test_core_errors_map_to_sysexits() {
        assert_eq!(
            code_of(CredCheckError::InvalidInput("too big".into()).into()),
            INPUT_ERROR
        );
        assert_eq!(
            code_of(CredCheckError::ExtractionFailure("no QR".into()).into()),
            VERIFICATION_FAILED
        );
        assert_eq!(
            code_of(CredCheckError::from(RemoteError::timeout()).into()),
            NETWORK_ERROR
        );
    }

    #[test]
    fn test_rejected_upload_is_input_error_shown_once() {
        let rejected = Rejected {
            error: CredCheckError::InvalidInput("File too large".into()),
            effects: vec![Effect::ShowInlineError("File too large".into())],
        };
        let exit = ExitCode::from_anyhow(&rejected.into());
        assert_eq!(exit.code, INPUT_ERROR);
        assert!(exit.message.is_none());

        let busy = Rejected {
            error: CredCheckError::SessionBusy,
            effects: Vec::new(),
        };
        let exit = ExitCode::from_anyhow(&busy.into());
        assert_eq!(exit.code, GENERAL_ERROR);
        assert!(exit.message.is_some());
    }

    #[test]
    fn test_context_does_not_hide_the_cause() {
        let err: anyhow::Result<()> = Err(CredCheckError::from(RemoteError::timeout()))
            .context("Verification request failed");
        assert_eq!(code_of(err.unwrap_err()), NETWORK_ERROR);

        let err = std::fs::read("/definitely/not/here.png")
            .context("Failed to read file")
            .unwrap_err();
        assert_eq!(code_of(err), INPUT_ERROR);
    }

    #[test]
    fn test_not_authentic() {
        let err = anyhow::Error::new(NotAuthentic(VerdictStatus::Suspicious));
        assert_eq!(code_of(err), VERIFICATION_FAILED);
        assert_eq!(
            NotAuthentic(VerdictStatus::Invalid).to_string(),
            "Document is INVALID"
        );
    }
}
