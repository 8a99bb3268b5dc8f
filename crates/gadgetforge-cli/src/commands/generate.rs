//! Generate command

use anyhow::Result;
use gadgetforge_core::{Classification, GadgetRegistry};
use gadgetforge_runtime::{Orchestrator, RunOptions, TransformerChainLibrary};
use std::path::Path;
use std::sync::Arc;

/// Classify gadgets from `config_path` and write every artifact into `output`.
///
/// Only an unusable output directory is an error; a missing config falls
/// back to the built-in classification and per-artifact failures are
/// reported, not returned.
pub async fn run(config_path: &Path, output: &Path) -> Result<()> {
    tracing::info!("Loading gadget config: {}", config_path.display());
    let (classification, warning) = Classification::load_or_default(config_path);
    if let Some(warning) = &warning {
        tracing::info!("Using built-in classification ({warning})");
    }
    tracing::info!(
        templates = classification.templates.len(),
        ref_funs = classification.ref_funs.len(),
        "Classified gadgets"
    );

    let orchestrator = Orchestrator::new(
        Arc::new(GadgetRegistry::builtin()),
        Arc::new(TransformerChainLibrary::default()),
        RunOptions::with_output_dir(output),
    );
    let report = orchestrator.run(&classification).await?;

    for failure in report.failures() {
        tracing::debug!(
            gadget = %failure.gadget,
            label = %failure.label,
            "Not generated: {}",
            failure.filename
        );
    }
    match report.to_json() {
        Ok(json) => tracing::trace!("Run report:\n{json}"),
        Err(e) => tracing::warn!("Could not render run report: {e}"),
    }

    tracing::info!(
        "✓ {} written, {} failed, {} excluded -> {}",
        report.succeeded(),
        report.failed(),
        report.excluded,
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generates_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gadgets");

        run(&dir.path().join("missing.yaml"), &out).await.unwrap();

        assert!(out.join("transform_raw_cmd_CommonsCollections6.ser").exists());
    }

    #[tokio::test]
    async fn test_unusable_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();

        assert!(run(&dir.path().join("missing.yaml"), &file.join("out")).await.is_err());
    }
}
