//! Per-scenario workspace staging
//!
//! Every scenario runs from its own temporary workspace:
//!
//! ```text
//! <tmp>/
//!   .devcontainer/devcontainer.json   generated configuration
//!   .devcontainer/src/...             copy of the feature source tree
//!   test.sh                           verification script, when present
//! ```

use crate::synth::SynthesizedConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, instrument};

/// Name of the configuration directory inside a workspace
pub const DEVCONTAINER_DIR: &str = ".devcontainer";

/// A temporary workspace owned by one scenario.
///
/// Dropping the workspace removes the directory; [`ScenarioWorkspace::retain`]
/// keeps it on disk instead.
#[derive(Debug)]
pub struct ScenarioWorkspace {
    dir: TempDir,
}

impl ScenarioWorkspace {
    /// Create a fresh workspace under the system temp directory
    #[instrument(level = "debug")]
    pub fn create(feature_id: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("devcontainer-test-{feature_id}-"))
            .tempdir()?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn devcontainer_dir(&self) -> PathBuf {
        self.dir.path().join(DEVCONTAINER_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.devcontainer_dir().join("devcontainer.json")
    }

    /// Write the generated configuration and copy the feature sources next to it
    pub fn stage(&self, config: &SynthesizedConfig, feature_source: &Path) -> io::Result<()> {
        let devcontainer_dir = self.devcontainer_dir();
        fs::create_dir_all(&devcontainer_dir)?;
        copy_tree(feature_source, &devcontainer_dir.join("src"))?;
        fs::write(self.config_path(), config.to_json_pretty())?;
        debug!("Staged configuration at {}", self.config_path().display());
        Ok(())
    }

    /// Copy the verification script to the workspace root as `test.sh`
    pub fn install_test_script(&self, script: &Path) -> io::Result<()> {
        fs::copy(script, self.dir.path().join("test.sh"))?;
        Ok(())
    }

    /// Remove the workspace from disk
    pub fn remove(self) -> io::Result<()> {
        self.dir.close()
    }

    /// Keep the workspace on disk and return its path
    #[allow(deprecated)]
    pub fn retain(self) -> PathBuf {
        self.dir.into_path()
    }
}

/// Recursively copy `src` into `dest`.
///
/// Files and subdirectories are copied verbatim and file permissions are
/// preserved, so executable scripts stay executable. Entries that are neither
/// files nor directories are skipped.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target)?;
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }
    Ok(())
}
