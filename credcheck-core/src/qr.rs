//! QR payload extraction.
//!
//! The decoder is a pluggable capability: `decode(pixels, width, height)`
//! returns the payload of the first code the detector reports, or `None`.
//! A missing or malformed pattern is not an error, the file was readable but
//! carried no payload.
//!
//! - [`RqrrDecoder`] - real detector (feature `qr`)
//! - [`FixtureDecoder`] - deterministic answers for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::error::{CredCheckError, Result};
use crate::ingest::PixelBuffer;
use crate::verdict::Outcome;

/// Failure message when an image carries no readable code.
pub const NO_QR_FOUND_MESSAGE: &str = "No QR code found in image";

/// Trait for QR decoders.
///
/// `pixels` are row-major RGBA samples, four bytes per pixel.
pub trait QrDecoder: Send + Sync {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;

    /// Identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Run `decoder` over a rasterized upload.
pub fn decode_qr(decoder: &dyn QrDecoder, buffer: &PixelBuffer) -> Option<String> {
    let payload = decoder.decode(buffer.samples(), buffer.width(), buffer.height());
    debug!(
        decoder = decoder.name(),
        width = buffer.width(),
        height = buffer.height(),
        found = payload.is_some(),
        "QR decode finished"
    );
    payload
}

/// Decode and wrap the payload as a scan outcome.
///
/// A missing code is an [`CredCheckError::ExtractionFailure`].
pub fn scan(decoder: &dyn QrDecoder, buffer: &PixelBuffer) -> Result<Outcome> {
    decode_qr(decoder, buffer)
        .map(Outcome::scanned)
        .ok_or_else(|| CredCheckError::ExtractionFailure(NO_QR_FOUND_MESSAGE.to_string()))
}

/// Luma of an RGBA sample, composited over white.
#[cfg_attr(not(feature = "qr"), allow(dead_code))]
fn luma(rgba: &[u8]) -> u8 {
    let (r, g, b, a) = (rgba[0] as u32, rgba[1] as u32, rgba[2] as u32, rgba[3] as u32);
    let y = (299 * r + 587 * g + 114 * b) / 1000;
    ((y * a + 255 * (255 - a)) / 255) as u8
}

#[cfg(feature = "qr")]
mod rqrr_impl {
    use tracing::{debug, warn};

    use super::{luma, QrDecoder};

    /// QR detector backed by `rqrr`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RqrrDecoder;

    impl QrDecoder for RqrrDecoder {
        fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
            let (w, h) = (width as usize, height as usize);
            let expected = w.checked_mul(h).and_then(|n| n.checked_mul(4));
            if w == 0 || h == 0 || expected != Some(pixels.len()) {
                warn!(
                    width,
                    height,
                    len = pixels.len(),
                    "Pixel buffer does not match dimensions"
                );
                return None;
            }

            let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
                let i = (y * w + x) * 4;
                luma(&pixels[i..i + 4])
            });
            let grids = prepared.detect_grids();
            debug!(candidates = grids.len(), "Detected QR grids");

            grids.iter().find_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(content),
                Err(e) => {
                    debug!(error = ?e, "Grid failed to decode");
                    None
                }
            })
        }

        fn name(&self) -> &'static str {
            "rqrr"
        }
    }
}

#[cfg(feature = "qr")]
pub use rqrr_impl::RqrrDecoder;

/// Deterministic decoder for tests.
/// Answers by image dimensions first, then falls back to a default.
#[derive(Debug, Default)]
pub struct FixtureDecoder {
    by_size: HashMap<(u32, u32), String>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl FixtureDecoder {
    /// Always report `payload`.
    pub fn always(payload: impl Into<String>) -> Self {
        Self {
            fallback: Some(payload.into()),
            ..Default::default()
        }
    }

    /// Never find a code.
    pub fn never() -> Self {
        Self::default()
    }

    /// Report `payload` for images of exactly `width` x `height`.
    pub fn with_fixture(mut self, width: u32, height: u32, payload: impl Into<String>) -> Self {
        self.by_size.insert((width, height), payload.into());
        self
    }

    /// Number of times `decode` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QrDecoder for FixtureDecoder {
    fn decode(&self, _pixels: &[u8], width: u32, height: u32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_size
            .get(&(width, height))
            .or(self.fallback.as_ref())
            .cloned()
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::new(width, height, vec![255; (width * height * 4) as usize]).unwrap()
    }

    #[test]
    fn test_fixture_decoder_deterministic() {
        let decoder = FixtureDecoder::always("CERT:JH-UNI-2018-201");
        let buffer = blank(8, 8);

        assert_eq!(
            decode_qr(&decoder, &buffer),
            Some("CERT:JH-UNI-2018-201".to_string())
        );
        assert_eq!(
            decode_qr(&decoder, &buffer),
            Some("CERT:JH-UNI-2018-201".to_string())
        );
        assert_eq!(decoder.calls(), 2);
    }

    #[test]
    fn test_fixture_decoder_by_size() {
        let decoder = FixtureDecoder::never().with_fixture(4, 4, "small");
        assert_eq!(decode_qr(&decoder, &blank(4, 4)), Some("small".to_string()));
        assert_eq!(decode_qr(&decoder, &blank(5, 4)), None);
    }

    #[test]
    fn test_scan_without_code_is_extraction_failure() {
        let err = scan(&FixtureDecoder::never(), &blank(4, 4)).unwrap_err();
        assert_eq!(
            err,
            CredCheckError::ExtractionFailure(NO_QR_FOUND_MESSAGE.to_string())
        );
        let outcome = scan(&FixtureDecoder::always("CERT-42"), &blank(4, 4)).unwrap();
        assert_eq!(outcome.extraction().identifier(), Some("CERT-42"));
    }

    #[test]
    fn test_luma_composites_transparent_over_white() {
        assert_eq!(luma(&[0, 0, 0, 255]), 0);
        assert_eq!(luma(&[0, 0, 0, 0]), 255);
        assert_eq!(luma(&[255, 255, 255, 255]), 255);
    }

    #[cfg(feature = "qr")]
    mod rqrr_tests {
        use super::*;
        use crate::ingest::{ingest, UploadPolicy};

        const QUIET_ZONE: usize = 4;

        /// Render codes side by side on white, `scale` pixels per module.
        fn render(payloads: &[&str], scale: usize) -> PixelBuffer {
            let codes: Vec<qrcode::QrCode> = payloads
                .iter()
                .map(|p| qrcode::QrCode::new(p.as_bytes()).unwrap())
                .collect();
            let tiles: Vec<usize> = codes
                .iter()
                .map(|c| (c.width() + 2 * QUIET_ZONE) * scale)
                .collect();
            let width: usize = tiles.iter().sum();
            let height = *tiles.iter().max().unwrap();

            let mut samples = vec![255u8; width * height * 4];
            let mut left = 0;
            for (code, tile) in codes.iter().zip(&tiles) {
                let modules = code.width();
                for (i, color) in code.to_colors().iter().enumerate() {
                    if !matches!(color, qrcode::Color::Dark) {
                        continue;
                    }
                    let (mx, my) = (i % modules + QUIET_ZONE, i / modules + QUIET_ZONE);
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let (x, y) = (left + mx * scale + dx, my * scale + dy);
                            let at = (y * width + x) * 4;
                            samples[at..at + 3].fill(0);
                        }
                    }
                }
                left += tile;
            }
            PixelBuffer::new(width as u32, height as u32, samples).unwrap()
        }

        #[test]
        fn test_decodes_rendered_code() {
            let buffer = render(&["CERT:JH-UNI-2018-201"], 4);
            assert_eq!(
                decode_qr(&RqrrDecoder, &buffer),
                Some("CERT:JH-UNI-2018-201".to_string())
            );
        }

        #[test]
        fn test_two_codes_yield_first_reported() {
            let buffer = render(&["JH-UNI-2018-201", "JH-UNI-2019-044"], 4);
            let (w, h) = (buffer.width() as usize, buffer.height() as usize);
            let samples = buffer.samples();

            let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
                let i = (y * w + x) * 4;
                luma(&samples[i..i + 4])
            });
            let grids = prepared.detect_grids();
            assert_eq!(grids.len(), 2);
            let first = grids
                .iter()
                .find_map(|grid| grid.decode().ok().map(|(_, content)| content));

            let payload = RqrrDecoder.decode(samples, buffer.width(), buffer.height());
            assert_eq!(payload, first);
            assert!(matches!(
                payload.as_deref(),
                Some("JH-UNI-2018-201") | Some("JH-UNI-2019-044")
            ));
        }

        #[test]
        fn test_scan_of_uploaded_png() {
            let buffer = render(&["https://registry.example/cert/JH-UNI-2018-201"], 3);
            let img = image::RgbaImage::from_raw(
                buffer.width(),
                buffer.height(),
                buffer.samples().to_vec(),
            )
            .unwrap();
            let mut png = std::io::Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut png, image::ImageFormat::Png)
                .unwrap();

            let document =
                ingest(png.into_inner(), "image/png", None, &UploadPolicy::qr_scan()).unwrap();
            let outcome = scan(&RqrrDecoder, document.pixels()).unwrap();
            assert_eq!(
                outcome.extraction().identifier(),
                Some("https://registry.example/cert/JH-UNI-2018-201")
            );
        }

        #[test]
        fn test_blank_image_has_no_payload() {
            assert_eq!(decode_qr(&RqrrDecoder, &blank(64, 64)), None);
        }

        #[test]
        fn test_noise_image_has_no_payload() {
            let samples: Vec<u8> = (0..32 * 32)
                .flat_map(|i: u32| {
                    let v = if (i * 7919) % 3 == 0 { 0 } else { 255 };
                    [v, v, v, 255]
                })
                .collect();
            let buffer = PixelBuffer::new(32, 32, samples).unwrap();
            assert_eq!(decode_qr(&RqrrDecoder, &buffer), None);
        }

        #[test]
        fn test_mismatched_buffer_is_none_not_panic() {
            assert_eq!(RqrrDecoder.decode(&[0u8; 10], 4, 4), None);
            assert_eq!(RqrrDecoder.decode(&[], 0, 0), None);
        }

        #[test]
        fn test_overflowing_dimensions_are_none() {
            assert_eq!(RqrrDecoder.decode(&[0u8; 16], u32::MAX, u32::MAX), None);
            assert_eq!(RqrrDecoder.decode(&[0u8; 16], 65536, 16384), None);
        }
    }
}
