//! Core library for the devcontainer feature test harness
//!
//! This crate contains feature layout validation, descriptor and scenario
//! catalog parsing, devcontainer configuration synthesis, workspace staging,
//! the lifecycle tool abstraction, the scenario runner, reporting, settings,
//! logging, and error handling.

pub mod errors;
pub mod feature;
pub mod json;
pub mod layout;
pub mod lifecycle;
pub mod live;
pub mod logging;
pub mod publish;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod settings;
pub mod staging;
pub mod synth;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = version();
        assert!(!version.is_empty());
        assert!(version.contains('.'));
    }
}
