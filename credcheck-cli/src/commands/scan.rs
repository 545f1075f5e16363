//! Scan command implementation.

use std::path::PathBuf;

use anyhow::Result;
use credcheck_core::{RqrrDecoder, Workflow};

/// Execute the scan command. Decoding is local; no network access.
pub async fn execute(file: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let mut workflow = Workflow::qr_scan(RqrrDecoder);
    super::run_workflow(&mut workflow, &file, quiet || json).await?;
    super::finish(workflow.session(), json, quiet)
}
