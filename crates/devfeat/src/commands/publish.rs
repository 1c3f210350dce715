//! Publish command implementation
//!
//! Implements `devfeat publish` on top of `devcontainer features publish`.

use super::devcontainer_cli;
use anyhow::{Context, Result};
use devfeat_core::publish::publish_feature;
use devfeat_core::report::Reporter;
use devfeat_core::settings::Settings;
use std::path::Path;
use tracing::instrument;

/// Publish command arguments
#[derive(Debug, Clone)]
pub struct PublishArgs {
    pub registry: String,
    pub namespace: String,
    pub dry_run: bool,
}

/// Execute the publish command
#[instrument(skip(settings))]
pub async fn execute_publish(args: PublishArgs, base: &Path, settings: &Settings) -> Result<()> {
    let tool = devcontainer_cli(settings);
    let mut reporter = Reporter::stdout();

    let target = publish_feature(
        &tool,
        base,
        &args.registry,
        &args.namespace,
        args.dry_run,
        &mut reporter,
    )
    .await
    .context("Failed to publish feature")?;

    if !args.dry_run {
        reporter.blank();
        reporter.line(format!("🎉 Feature {} published", target.reference()));
    }
    Ok(())
}
