//! Live command implementation

use super::devcontainer_cli;
use anyhow::{Context, Result};
use devfeat_core::live::start_live;
use devfeat_core::report::Reporter;
use devfeat_core::settings::Settings;
use std::path::Path;
use tracing::{info, instrument};

/// Live command arguments
#[derive(Debug, Clone, Default)]
pub struct LiveArgs {
    /// Open the workspace once the container is up
    pub open: bool,
}

/// Execute the live command
#[instrument(skip(settings))]
pub async fn execute_live(args: LiveArgs, base: &Path, settings: &Settings) -> Result<()> {
    let tool = devcontainer_cli(settings);
    let mut reporter = Reporter::stdout();

    let session = start_live(&tool, base, args.open, &mut reporter)
        .await
        .context("Failed to start live environment")?;
    info!("Live workspace at {}", session.workspace.display());
    Ok(())
}
