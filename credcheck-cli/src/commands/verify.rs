//! Verify command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use credcheck_core::{EndpointFlavor, HttpVerifier, VerifierConfig, Workflow};

/// Flags of `credcheck verify`.
pub struct VerifyOptions {
    pub api_url: Option<String>,
    pub legacy: bool,
    pub timeout: Option<u64>,
    pub json: bool,
    pub quiet: bool,
}

impl VerifyOptions {
    /// Environment defaults with command-line overrides applied.
    fn config(&self) -> VerifierConfig {
        let mut config = VerifierConfig::default();
        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        if self.legacy {
            config.endpoint = EndpointFlavor::Legacy;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Execute the verify command.
pub async fn execute(file: PathBuf, options: VerifyOptions) -> Result<()> {
    let verifier = HttpVerifier::with_config(options.config())?;
    let mut workflow = Workflow::certificate(verifier);

    super::run_workflow(&mut workflow, &file, options.quiet || options.json).await?;
    super::finish(workflow.session(), options.json, options.quiet)
}
