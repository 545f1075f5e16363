//! Image ingestion.
//!
//! Validates an uploaded file against an [`UploadPolicy`] and rasterizes it
//! into an RGBA [`PixelBuffer`]. Validation happens before any decoding, so an
//! oversize file is rejected without being parsed.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{CredCheckError, Result};

/// Hard upload cap in bytes (10 MB), shared by both workflows.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted by the certificate verification endpoint.
pub const CERTIFICATE_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/tiff"];

/// Which content types an upload path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeRule {
    /// Only the listed types (compared case-insensitively).
    Exact(&'static [&'static str]),
    /// Any `image/*` type.
    AnyImage,
}

impl MimeRule {
    fn accepts(&self, mime: &str) -> bool {
        match self {
            Self::Exact(types) => types.iter().any(|t| *t == mime),
            Self::AnyImage => mime.starts_with("image/"),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Exact(types) => types.join(", "),
            Self::AnyImage => "image/*".to_string(),
        }
    }
}

/// Upload validation rules for one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub accepted: MimeRule,
    pub max_file_size: usize,
}

impl UploadPolicy {
    /// JPEG, PNG or TIFF up to 10 MB.
    pub fn certificate() -> Self {
        Self {
            accepted: MimeRule::Exact(CERTIFICATE_MIME_TYPES),
            max_file_size: MAX_UPLOAD_SIZE,
        }
    }

    /// Any image up to 10 MB.
    pub fn qr_scan() -> Self {
        Self {
            accepted: MimeRule::AnyImage,
            max_file_size: MAX_UPLOAD_SIZE,
        }
    }

    /// Validates the Content-Type of an uploaded file.
    pub fn validate_content_type(&self, mime_type: &str) -> Result<()> {
        let normalized = normalize_mime(mime_type);
        if self.accepted.accepts(&normalized) {
            Ok(())
        } else {
            Err(CredCheckError::InvalidInput(format!(
                "Unsupported file type '{}'. Allowed types: {}",
                mime_type,
                self.accepted.describe()
            )))
        }
    }

    /// Validates the size of an uploaded file.
    pub fn validate_file_size(&self, size: usize) -> Result<()> {
        if size > self.max_file_size {
            let max_mb = self.max_file_size / (1024 * 1024);
            Err(CredCheckError::InvalidInput(format!(
                "File too large: {:.1} MB exceeds maximum of {} MB",
                size as f64 / (1024.0 * 1024.0),
                max_mb
            )))
        } else {
            Ok(())
        }
    }
}

/// Lowercases and strips parameters (`image/png; charset=x` -> `image/png`).
fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Guess a MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Row-major RGBA samples, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA samples, checking that the length matches the dimensions.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                CredCheckError::InvalidInput(format!("Image dimensions {width}x{height} are too large"))
            })?;
        if samples.len() != expected {
            return Err(CredCheckError::InvalidInput(format!(
                "Pixel buffer has {} bytes, expected {} for {}x{} RGBA",
                samples.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

impl From<image::RgbaImage> for PixelBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            samples: img.into_raw(),
        }
    }
}

/// A validated, rasterized upload. Immutable once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedDocument {
    raw_bytes: Vec<u8>,
    mime_type: String,
    file_name: Option<String>,
    pixels: PixelBuffer,
}

impl UploadedDocument {
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn size_bytes(&self) -> usize {
        self.raw_bytes.len()
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }
}

/// Validate and rasterize an uploaded file.
///
/// Fails with [`CredCheckError::InvalidInput`] when the type is not accepted,
/// the file exceeds the size cap, or the bytes do not decode as an image.
pub fn ingest(
    raw_bytes: Vec<u8>,
    mime_type: &str,
    file_name: Option<String>,
    policy: &UploadPolicy,
) -> Result<UploadedDocument> {
    policy.validate_content_type(mime_type)?;
    policy.validate_file_size(raw_bytes.len())?;

    let decoded = image::load_from_memory(&raw_bytes).map_err(|e| {
        warn!(error = %e, mime_type, "Failed to decode uploaded image");
        CredCheckError::InvalidInput(format!("Could not read image: {e}"))
    })?;

    let pixels = PixelBuffer::from(decoded.to_rgba8());
    debug!(
        width = pixels.width(),
        height = pixels.height(),
        bytes = raw_bytes.len(),
        "Rasterized upload"
    );

    Ok(UploadedDocument {
        raw_bytes,
        mime_type: normalize_mime(mime_type),
        file_name,
        pixels,
    })
}
