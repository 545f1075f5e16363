//! WebAssembly bindings for the credcheck workflow.
//!
//! The browser owns the file picker and performs the HTTP request itself;
//! this module owns everything else: upload validation, rasterization, QR
//! decoding, response interpretation, the session state machine and the
//! display model. Every call returns a JSON string.

use credcheck_core::{
    parse_certificate_response, parse_legacy_response, present, qr, CredCheckError,
    EndpointFlavor, Outcome, RemoteError, RemoteErrorKind, RqrrDecoder, WorkflowKind,
    WorkflowSession,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Reply to every session call: what to do, and what to show.
#[derive(Serialize)]
struct Reply<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReply>,
    effects: Vec<credcheck_core::Effect>,
    view: credcheck_core::DisplayModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a Outcome>,
}

#[derive(Serialize)]
struct ErrorReply {
    kind: &'static str,
    message: String,
}

impl From<&CredCheckError> for ErrorReply {
    fn from(err: &CredCheckError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":{{"kind":"serialization","message":"{e}"}}}}"#)
    })
}

fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

/// One verification session per page.
#[wasm_bindgen]
pub struct Session {
    inner: WorkflowSession,
    endpoint: EndpointFlavor,
}

#[wasm_bindgen]
impl Session {
    /// `kind` is `"certificate"` or `"qr"`; `legacy` selects the `/verify`
    /// response contract for certificates.
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, legacy: bool) -> Result<Session, JsValue> {
        let kind = parse_kind(kind).ok_or_else(|| {
            JsValue::from(js_sys::Error::new(&format!(
                "Unknown workflow kind '{kind}', expected 'certificate' or 'qr'"
            )))
        })?;
        let endpoint = if legacy {
            EndpointFlavor::Legacy
        } else {
            EndpointFlavor::Current
        };
        Ok(Self::with_kind(kind, endpoint))
    }

    /// Endpoint path the page should POST the file to.
    pub fn endpoint_path(&self) -> String {
        self.endpoint.path().to_string()
    }

    /// Multipart field name carrying the file.
    pub fn field_name(&self) -> String {
        self.endpoint.field_name().to_string()
    }

    /// The user picked a file.
    pub fn select_file(&mut self, bytes: &[u8], mime_type: &str, file_name: Option<String>) -> String {
        match self.inner.select_file(bytes.to_vec(), mime_type, file_name) {
            Ok(effects) => self.reply(Ok(effects)),
            Err(rejected) => self.respond(Some(&rejected.error), rejected.effects),
        }
    }

    /// Decode the selected image locally (QR sessions).
    pub fn scan(&mut self) -> String {
        if let Err(err) = self.expect_kind(WorkflowKind::QrScan, "scan()") {
            return self.reply(Err(err));
        }
        let result = match self.inner.processing_document() {
            Some(document) => qr::scan(&RqrrDecoder, document.pixels()),
            None => Err(CredCheckError::InvalidTransition(
                "scan() requires a selected file".into(),
            )),
        };
        let completed = self.inner.complete(result);
        self.reply(completed)
    }

    /// The page's request finished with an HTTP response (certificate sessions).
    pub fn complete_with_response(&mut self, status: u16, body: &[u8]) -> String {
        if let Err(err) = self.expect_kind(WorkflowKind::Certificate, "complete_with_response()") {
            return self.reply(Err(err));
        }
        let result = match self.endpoint {
            EndpointFlavor::Current => parse_certificate_response(status, body),
            EndpointFlavor::Legacy => parse_legacy_response(status, body),
        };
        let completed = self.inner.complete(result);
        self.reply(completed)
    }

    /// The page's request failed before a response arrived.
    /// `reason` is `"timeout"`, `"connect"` or anything else for transport.
    pub fn complete_with_network_error(&mut self, reason: &str, message: &str) -> String {
        if let Err(err) =
            self.expect_kind(WorkflowKind::Certificate, "complete_with_network_error()")
        {
            return self.reply(Err(err));
        }
        let kind = match reason {
            "timeout" => RemoteErrorKind::Timeout,
            "connect" => RemoteErrorKind::Connect,
            _ => RemoteErrorKind::Transport,
        };
        warn(&format!("verification request failed ({reason}): {message}"));
        let failure = RemoteError::new(kind, credcheck_core::GENERIC_FAILURE_MESSAGE);
        let completed = self.inner.complete(Err(failure.into()));
        self.reply(completed)
    }

    /// "Try again" / "Scan again".
    pub fn reset(&mut self) -> String {
        let result = self.inner.reset();
        self.reply(result)
    }

    /// Current display model without a transition.
    pub fn view(&self) -> String {
        self.reply(Ok(Vec::new()))
    }
}

impl Session {
    fn with_kind(kind: WorkflowKind, endpoint: EndpointFlavor) -> Self {
        Self {
            inner: WorkflowSession::new(kind),
            endpoint,
        }
    }

    fn expect_kind(&self, kind: WorkflowKind, call: &str) -> credcheck_core::Result<()> {
        if self.inner.kind() == kind {
            Ok(())
        } else {
            Err(CredCheckError::InvalidTransition(format!(
                "{call} is not available in a {:?} session",
                self.inner.kind()
            )))
        }
    }

    fn reply(&self, result: credcheck_core::Result<Vec<credcheck_core::Effect>>) -> String {
        match result {
            Ok(effects) => self.respond(None, effects),
            Err(err) => self.respond(Some(&err), Vec::new()),
        }
    }

    fn respond(&self, error: Option<&CredCheckError>, effects: Vec<credcheck_core::Effect>) -> String {
        if let Some(err) = error {
            warn(&err.to_string());
        }
        to_json(&Reply {
            ok: error.is_none(),
            error: error.map(ErrorReply::from),
            effects,
            view: present(&self.inner),
            outcome: self.inner.outcome(),
        })
    }
}

fn parse_kind(kind: &str) -> Option<WorkflowKind> {
    match kind.to_ascii_lowercase().as_str() {
        "certificate" => Some(WorkflowKind::Certificate),
        "qr" | "qr_scan" => Some(WorkflowKind::QrScan),
        _ => None,
    }
}

/// Check type and size before reading a file.
///
/// Returns `null` when accepted, otherwise the message to show inline.
#[wasm_bindgen]
pub fn validate_upload(kind: &str, mime_type: &str, size_bytes: usize) -> Option<String> {
    let Some(kind) = parse_kind(kind) else {
        return Some(format!("Unknown workflow kind '{kind}'"));
    };
    let policy = kind.policy();
    policy
        .validate_content_type(mime_type)
        .and_then(|()| policy.validate_file_size(size_bytes))
        .err()
        .map(|e| e.user_message())
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
