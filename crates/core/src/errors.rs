//! Error types and handling
//!
//! The taxonomy mirrors how failures are scoped during a test run:
//! structural and configuration errors are fatal and abort before any
//! scenario starts, lifecycle errors are scoped to a single step of a single
//! scenario. Everything is wrapped in [`HarnessError`] for unified handling.

use std::path::PathBuf;
use thiserror::Error;

/// Feature layout errors (required files or directories missing)
#[derive(Error, Debug)]
pub enum StructureError {
    /// The feature directory does not contain the required files
    #[error("Invalid feature structure in {}: missing {}", base.display(), missing.join(", "))]
    InvalidLayout {
        /// Directory that was inspected
        base: PathBuf,
        /// Required relative paths that were not found
        missing: Vec<String>,
        /// Entries actually present in `base` (directories end with `/`)
        found: Vec<String>,
    },

    /// A single required path is missing
    #[error("Required path not found: {}", path.display())]
    MissingPath { path: PathBuf },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A JSON or TOML file could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parsing { path: String, message: String },

    /// A configuration file could not be read
    #[error("Failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A parsed value is semantically invalid
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// The requested scenario does not exist in the catalog
    #[error("Scenario '{name}' not found (available: {})", available.join(", "))]
    UnknownScenario {
        name: String,
        available: Vec<String>,
    },
}

/// Errors raised while driving the external lifecycle tool
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The tool binary could not be started
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited unsuccessfully
    #[error("Command '{command}' failed with exit code {exit_code}")]
    Failed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The tool did not finish within its time budget and was killed
    #[error("Command '{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
}

impl LifecycleError {
    /// Captured stdout, when the tool produced any
    pub fn stdout(&self) -> Option<&str> {
        match self {
            LifecycleError::Failed { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Captured stderr, when the tool produced any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            LifecycleError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Feature layout errors
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Lifecycle tool errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Filesystem errors while staging a workspace
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;
