//! Feature source layout
//!
//! A feature directory is expected to look like:
//!
//! ```text
//! <base>/
//!   src/devcontainer-feature.json
//!   src/install.sh
//!   test/scenarios.json
//!   test/test.sh        (optional)
//! ```

use crate::errors::StructureError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Feature descriptor, relative to the base directory
pub const DESCRIPTOR_PATH: &str = "src/devcontainer-feature.json";
/// Install script, relative to the base directory
pub const INSTALL_SCRIPT_PATH: &str = "src/install.sh";
/// Scenario catalog, relative to the base directory
pub const SCENARIOS_PATH: &str = "test/scenarios.json";
/// Optional verification script, relative to the base directory
pub const TEST_SCRIPT_PATH: &str = "test/test.sh";

/// Paths listed when the layout is invalid
pub const EXPECTED_STRUCTURE: [&str; 4] = [
    DESCRIPTOR_PATH,
    INSTALL_SCRIPT_PATH,
    SCENARIOS_PATH,
    TEST_SCRIPT_PATH,
];

/// Name of the feature directory inside a repository checkout
const FEATURE_DIR_NAME: &str = "feature";

/// Resolve the feature base directory.
///
/// An explicit root wins. Otherwise the current directory is used when it is
/// itself named `feature`, and `<cwd>/feature` when it is not.
pub fn resolve_base_dir(root: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(root) = root {
        return if root.is_absolute() {
            root.to_path_buf()
        } else {
            cwd.join(root)
        };
    }
    if cwd.file_name().is_some_and(|name| name == FEATURE_DIR_NAME) {
        cwd.to_path_buf()
    } else {
        cwd.join(FEATURE_DIR_NAME)
    }
}

/// A feature directory whose required files have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    base: PathBuf,
}

impl FeatureLayout {
    /// Validate that `base` contains the descriptor and the scenario catalog
    pub fn discover(base: impl Into<PathBuf>) -> Result<Self, StructureError> {
        let base = base.into();
        let missing: Vec<String> = [DESCRIPTOR_PATH, SCENARIOS_PATH]
            .into_iter()
            .filter(|rel| !base.join(rel).is_file())
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(StructureError::InvalidLayout {
                found: list_entries(&base),
                base,
                missing,
            });
        }

        debug!("Feature layout found at {}", base.display());
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory copied into every generated workspace
    pub fn source_dir(&self) -> PathBuf {
        self.base.join("src")
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.base.join(DESCRIPTOR_PATH)
    }

    pub fn scenarios_path(&self) -> PathBuf {
        self.base.join(SCENARIOS_PATH)
    }

    /// The verification script, if the feature ships one
    pub fn test_script(&self) -> Option<PathBuf> {
        let path = self.base.join(TEST_SCRIPT_PATH);
        path.is_file().then_some(path)
    }

    /// Path where the verification script would live
    pub fn test_script_path(&self) -> PathBuf {
        self.base.join(TEST_SCRIPT_PATH)
    }
}

/// Entries of `dir`, sorted, with directories suffixed by `/`.
/// An unreadable directory yields an empty list.
pub fn list_entries(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut entries: Vec<String> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => format!("{name}/"),
                _ => name,
            }
        })
        .collect();
    entries.sort();
    entries
}
