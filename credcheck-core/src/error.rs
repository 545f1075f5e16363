use thiserror::Error;

/// Generic message shown when the remote service gives no usable reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Verification failed. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredCheckError {
    /// Wrong MIME type, oversize file or unreadable image. Recovered inline.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The file was readable but no signal came out of it
    /// (no QR pattern, or the service answered `success: false`).
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A file was selected while a verification was still in flight.
    #[error("A verification is already in progress")]
    SessionBusy,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl CredCheckError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::ExtractionFailure(msg) => msg.clone(),
            Self::Remote(err) => err.message.clone(),
            Self::Config(_) | Self::InvalidTransition(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::SessionBusy => self.to_string(),
        }
    }

    /// Short machine-readable classification used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ExtractionFailure(_) => "extraction_failure",
            Self::Remote(err) => err.kind.as_str(),
            Self::Config(_) => "config",
            Self::SessionBusy => "session_busy",
            Self::InvalidTransition(_) => "invalid_transition",
        }
    }
}

/// Failure talking to the remote verification service.
///
/// Every variant renders the same way to the user, but `kind` and `status`
/// keep a timeout apart from an HTTP 500 in logs and tests.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} ({kind})")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// Server-supplied `error` field when present, otherwise a generic message.
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(RemoteErrorKind::Timeout, GENERIC_FAILURE_MESSAGE)
    }

    /// HTTP status code, when the failure came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            RemoteErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// Could not connect (refused, DNS, TLS handshake).
    Connect,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// 2xx response whose body was not the expected JSON.
    MalformedResponse,
    /// Any other transport-level failure.
    Transport,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Status(_) => "http_status",
            Self::MalformedResponse => "malformed_response",
            Self::Transport => "transport",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "http_status {code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CredCheckError>;
