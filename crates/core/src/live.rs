//! Long-running development environment for a feature
//!
//! Stages the feature's sample `.devcontainer` config together with the
//! feature files into a fresh workspace and brings it up. The workspace is
//! kept afterwards since the environment outlives the command.

use crate::errors::{Result, StructureError};
use crate::layout::DESCRIPTOR_PATH;
use crate::lifecycle::{parse_up_result, LifecycleTool, ToolLogLevel};
use crate::report::Reporter;
use crate::staging::DEVCONTAINER_DIR;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Files a live environment is built from, relative to the feature base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSources {
    pub source_dir: PathBuf,
    pub devcontainer_config: PathBuf,
    pub descriptor: PathBuf,
    pub install_script: PathBuf,
}

impl LiveSources {
    /// Locate the live sources under `base`; the first missing path is an error
    pub fn discover(base: &Path) -> std::result::Result<Self, StructureError> {
        let source_dir = base.join("src");
        let sources = Self {
            devcontainer_config: source_dir.join(DEVCONTAINER_DIR).join("devcontainer.json"),
            descriptor: base.join(DESCRIPTOR_PATH),
            install_script: source_dir.join("install.sh"),
            source_dir,
        };

        if !sources.source_dir.is_dir() {
            return Err(StructureError::MissingPath {
                path: sources.source_dir,
            });
        }
        for path in [
            &sources.devcontainer_config,
            &sources.descriptor,
            &sources.install_script,
        ] {
            if !path.is_file() {
                return Err(StructureError::MissingPath { path: path.clone() });
            }
        }
        Ok(sources)
    }

    /// Copy the sources into `dir`:
    /// `.devcontainer/devcontainer.json` and `.devcontainer/feature/*`
    pub fn stage_into(&self, dir: &Path) -> io::Result<()> {
        let devcontainer_dir = dir.join(DEVCONTAINER_DIR);
        let feature_dir = devcontainer_dir.join("feature");
        fs::create_dir_all(&feature_dir)?;

        fs::copy(
            &self.devcontainer_config,
            devcontainer_dir.join("devcontainer.json"),
        )?;
        fs::copy(
            &self.descriptor,
            feature_dir.join("devcontainer-feature.json"),
        )?;
        let install = feature_dir.join("install.sh");
        fs::copy(&self.install_script, &install)?;
        make_executable(&install)?;
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// A started live environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSession {
    pub workspace: PathBuf,
    pub container_id: Option<String>,
}

/// Stage and start a live environment for the feature rooted at `base`
#[instrument(level = "debug", skip(tool, reporter))]
pub async fn start_live<T: LifecycleTool>(
    tool: T,
    base: &Path,
    open: bool,
    reporter: &mut Reporter,
) -> Result<LiveSession> {
    let sources = LiveSources::discover(base)?;

    let workspace = tempfile::Builder::new()
        .prefix("devcontainer-live-")
        .tempdir()?;
    #[allow(deprecated)]
    let workspace = workspace.into_path();
    reporter.line(format!(
        "📁 Creating temporary directory: {}",
        workspace.display()
    ));
    sources.stage_into(&workspace)?;
    reporter.line("✅ Temporary environment setup complete");

    reporter.line("🔧 Running devcontainer up...");
    let up = tool
        .up(&workspace, ToolLogLevel::Info)
        .await
        .and_then(|output| output.into_result("devcontainer up"));
    let output = match up {
        Ok(output) => output,
        Err(e) => {
            warn!("Live environment failed to start: {}", e);
            reporter.line(format!("❌ Failed to start DevContainer: {e}"));
            reporter.line(format!(
                "🗑️  You may want to clean up: rm -rf {}",
                workspace.display()
            ));
            return Err(e.into());
        }
    };

    let container_id = parse_up_result(&output.stdout).and_then(|r| r.container_id);
    match &container_id {
        Some(id) => {
            info!("Live container {} started", id);
            reporter.line("🎉 DevContainer started successfully!");
            reporter.line(format!("📦 Container: {id}"));
        }
        None => {
            reporter.line("✅ DevContainer started, but the container id could not be retrieved");
        }
    }
    reporter.line(format!("📁 Workspace: {}", workspace.display()));
    reporter.line("💻 Connect with one of these methods:");
    reporter.line(format!("   1. devcontainer open {}", workspace.display()));
    if let Some(id) = &container_id {
        reporter.line(format!("   2. docker exec -it {id} bash"));
    }
    reporter.line("   Or use \"Dev Containers: Attach to Running Container\" in your editor");

    if open {
        reporter.line("🚀 Opening the workspace...");
        tool.open(&workspace)
            .await?
            .into_result("devcontainer open")?;
    } else {
        reporter.line("💡 Tip: Add --open to open the workspace automatically");
    }
    reporter.flush();

    Ok(LiveSession {
        workspace,
        container_id,
    })
}
