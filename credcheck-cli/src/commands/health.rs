//! Health command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use credcheck_core::{HttpVerifier, VerifierConfig};

/// Check that the verification service is up.
pub async fn execute(api_url: Option<String>) -> Result<()> {
    let mut config = VerifierConfig::default();
    if let Some(url) = api_url {
        config.base_url = url;
    }
    let url = config.health_url();
    let verifier = HttpVerifier::with_config(config)?;

    let health = verifier
        .health()
        .await
        .with_context(|| format!("Health check failed: {url}"))?;

    println!(
        "{} {} {}",
        "✓".green(),
        health.status.bold(),
        health.message.as_deref().unwrap_or_default().dimmed()
    );
    Ok(())
}
