//! CLI integration tests for credcheck-cli.
//!
//! These tests run the actual binary and check outputs and exit codes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use axum::{routing::post, Json, Router};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Get a Command for the credcheck binary.
fn credcheck() -> Command {
    let mut cmd = Command::cargo_bin("credcheck").unwrap();
    cmd.env_remove("CREDCHECK_API_URL")
        .env_remove("CREDCHECK_LEGACY_ENDPOINT")
        .env("CREDCHECK_MAX_RETRIES", "0")
        .env("NO_COLOR", "1");
    cmd
}

fn write_png(path: &Path) {
    image::RgbaImage::from_pixel(24, 24, image::Rgba([255, 255, 255, 255]))
        .save(path)
        .unwrap();
}

/// Base URL where nothing is listening.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Serve `router` from a background thread and return its base URL.
fn spawn_stub(router: Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    format!("http://{addr}")
}

fn verify_stub(body: serde_json::Value) -> String {
    spawn_stub(Router::new().route(
        "/api/verify-certificate",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    ))
}

fn verified_body() -> serde_json::Value {
    json!({
        "success": true,
        "extracted_info": {
            "certificate_no": "JH-UNI-2018-201",
            "name": "Asha Kumari",
            "institution": "Jharkhand State University",
            "course": "BBA",
            "year": "2018",
            "raw_text": "",
            "processing_timestamp": "2024-05-01T10:00:00"
        },
        "forgery_detection": {
            "seal_authentic": true,
            "seal_match_score": 0.87,
            "signature_authentic": true,
            "signature_match_score": 0.92,
            "overall_authentic": true
        },
        "validation": {
            "is_valid": true,
            "status": "VERIFIED",
            "overall_confidence": 94,
            "confidence_scores": {"ocr_quality": 98, "seal_authentic": true},
            "matched_record": {
                "certificate_no": "JH-UNI-2018-201",
                "name": "Asha Kumari",
                "institution": "Jharkhand State University",
                "course": "BBA"
            }
        }
    })
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    credcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Certificate and QR document authentication",
        ))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn test_help_shows_exit_codes() {
    credcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_verify_help_shows_options() {
    credcheck()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--api-url"))
        .stdout(predicate::str::contains("--legacy"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    credcheck()
        .args(["verify", "--bogus", "x.png"])
        .assert()
        .code(64);
}

// ============================================================================
// Input Errors
// ============================================================================

#[test]
fn test_missing_file_returns_input_error() {
    credcheck()
        .args(["verify", "nonexistent_certificate.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_wrong_type_rejected_before_network() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("certificate.pdf");
    fs::write(&file, b"%PDF-1.7").unwrap();

    credcheck()
        .args(["verify", "--api-url", &dead_url(), file.to_str().unwrap()])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_gif_rejected_for_certificates_but_scannable() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("code.gif");
    image::RgbaImage::from_pixel(24, 24, image::Rgba([255, 255, 255, 255]))
        .save(&file)
        .unwrap();

    credcheck()
        .args(["verify", "--api-url", &dead_url(), file.to_str().unwrap()])
        .assert()
        .code(66);

    // Accepted by the QR path, but blank
    credcheck()
        .args(["scan", file.to_str().unwrap()])
        .assert()
        .code(65);
}

#[test]
fn test_oversize_file_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("huge.png");
    fs::write(&file, vec![0u8; 10 * 1024 * 1024 + 1]).unwrap();

    credcheck()
        .args(["scan", file.to_str().unwrap()])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("File too large"));
}

// ============================================================================
// Scan
// ============================================================================

#[test]
fn test_scan_without_code() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("blank.png");
    write_png(&file);

    credcheck()
        .args(["scan", file.to_str().unwrap()])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("Scan Failed. Try Again."))
        .stderr(predicate::str::contains("No QR code found in image"));
}

#[test]
fn test_scan_json_output() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("blank.png");
    write_png(&file);

    let output = credcheck()
        .args(["scan", "--json", file.to_str().unwrap()])
        .assert()
        .code(65)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["status"], "error");
    assert_eq!(report["error"]["kind"], "extraction_failure");
    assert_eq!(report["display"]["headline"], "Scan Failed. Try Again.");
}

// ============================================================================
// Verify against a stub service
// ============================================================================

#[test]
fn test_verify_unreachable_service() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("certificate.png");
    write_png(&file);

    credcheck()
        .args(["verify", "--api-url", &dead_url(), file.to_str().unwrap()])
        .assert()
        .code(69)
        .stdout(predicate::str::contains("Verification Failed"));
}

#[test]
fn test_verify_verified_certificate() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("certificate.png");
    write_png(&file);
    let base = verify_stub(verified_body());

    credcheck()
        .args(["verify", "--api-url", &base, file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Certificate Verified"))
        .stdout(predicate::str::contains("JH-UNI-2018-201"))
        .stdout(predicate::str::contains("Overall confidence"));
}

#[test]
fn test_verify_suspicious_certificate() {
    let mut body = verified_body();
    body["validation"]["matched_record"] = serde_json::Value::Null;
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("certificate.jpg");
    image::RgbImage::from_pixel(24, 24, image::Rgb([255, 255, 255]))
        .save(&file)
        .unwrap();
    let base = verify_stub(body);

    credcheck()
        .args(["verify", "--json", "--api-url", &base, file.to_str().unwrap()])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("\"SUSPICIOUS\""))
        .stderr(predicate::str::contains("Document is SUSPICIOUS"));
}

#[test]
fn test_health_unreachable() {
    credcheck()
        .args(["health", "--api-url", &dead_url()])
        .assert()
        .code(69)
        .stderr(predicate::str::contains("Health check failed"));
}
