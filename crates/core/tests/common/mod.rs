//! Shared test helpers for core integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A feature directory on disk with `src/` and `test/` populated
pub struct FeatureFixture {
    dir: TempDir,
}

impl FeatureFixture {
    /// Create a feature with the given descriptor and scenario catalog
    pub fn new(descriptor: &str, scenarios: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let test = dir.path().join("test");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&test).unwrap();
        fs::write(src.join("devcontainer-feature.json"), descriptor).unwrap();
        fs::write(src.join("install.sh"), "#!/bin/bash\necho installing\n").unwrap();
        fs::write(test.join("scenarios.json"), scenarios).unwrap();
        Self { dir }
    }

    /// Add a `test/test.sh` verification script
    pub fn with_test_script(self, content: &str) -> Self {
        fs::write(self.dir.path().join("test/test.sh"), content).unwrap();
        self
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }
}

/// Catalog with three scenarios declared out of alphabetical order
pub const THREE_SCENARIOS: &str = r#"{
    "zeta": {"image": "ubuntu:22.04"},
    "alpha": {"image": "debian:12", "features": {"my-feature": {"flag": true}}},
    "mid": {"image": "alpine:3.19", "features": {}}
}"#;

pub const MY_FEATURE: &str = r#"{"id": "my-feature", "version": "0.3.0"}"#;
