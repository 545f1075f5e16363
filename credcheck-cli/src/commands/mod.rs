//! Subcommand implementations.

pub mod health;
pub mod scan;
pub mod verify;

use std::path::Path;

use anyhow::{bail, Context, Result};
use credcheck_core::{
    mime_from_path, present, Extractor, ExtractionResult, VerdictStatus, Workflow,
    WorkflowSession, WorkflowState,
};
use serde_json::json;
use tracing::info;

use crate::exit_codes::NotAuthentic;
use crate::render;

/// Read `file` into the workflow, then run extraction.
///
/// Effects are rendered as each transition happens, so progress shows while
/// the extraction is in flight.
pub async fn run_workflow<E: Extractor>(
    workflow: &mut Workflow<E>,
    file: &Path,
    quiet: bool,
) -> Result<()> {
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let mime_type = mime_from_path(file);
    info!(path = %file.display(), bytes = content.len(), %mime_type, "Read file");

    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let effects = match workflow.select_file(content, &mime_type, file_name) {
        Ok(effects) => effects,
        Err(rejected) => {
            render::apply_effects(&rejected.effects, quiet);
            return Err(rejected.into());
        }
    };
    render::apply_effects(&effects, quiet);

    let effects = workflow.run().await?;
    render::apply_effects(&effects, quiet);
    Ok(())
}

/// Print a finished session and turn its state into the command result.
pub fn finish(session: &WorkflowSession, json: bool, quiet: bool) -> Result<()> {
    let model = present(session);

    if json {
        let failure = session.failure().map(|f| {
            json!({
                "kind": f.kind(),
                "message": f.user_message(),
            })
        });
        let report = json!({
            "status": session.status(),
            "outcome": session.outcome(),
            "error": failure,
            "display": model,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        render::print_model(&model);
    }

    match session.state() {
        WorkflowState::Success { outcome, .. } => {
            let status = outcome.verdict().status();
            match outcome.extraction() {
                ExtractionResult::Qr { .. } => Ok(()),
                _ if status == VerdictStatus::Verified => Ok(()),
                _ => Err(NotAuthentic(status).into()),
            }
        }
        WorkflowState::Error { failure, .. } => Err(failure.clone().into()),
        WorkflowState::Idle | WorkflowState::Processing { .. } => {
            bail!("Session did not finish (status: {:?})", session.status())
        }
    }
}
