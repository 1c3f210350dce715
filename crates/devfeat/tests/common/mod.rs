//! Shared helpers for devfeat CLI tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DESCRIPTOR: &str = r#"{"id": "my-feature", "name": "My Feature", "version": "0.3.0"}"#;

pub const SCENARIOS: &str = r#"{
    "basic": {"image": "ubuntu:22.04", "features": {"my-feature": {"flag": true}}},
    "minimal": {"image": "debian:12"}
}"#;

/// Feature directory plus a fake `devcontainer` executable that logs its
/// arguments and runs `exec` commands on the host inside the workspace
pub struct FeatureEnv {
    dir: TempDir,
}

impl FeatureEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let feature = dir.path().join("feature");
        fs::create_dir_all(feature.join("src")).unwrap();
        fs::create_dir_all(feature.join("test")).unwrap();
        fs::write(feature.join("src/devcontainer-feature.json"), DESCRIPTOR).unwrap();
        fs::write(feature.join("src/install.sh"), "#!/bin/sh\necho install\n").unwrap();
        fs::write(feature.join("test/scenarios.json"), SCENARIOS).unwrap();

        let env = Self { dir };
        env.write_fake_tool();
        env
    }

    /// The feature base directory (`<tmp>/feature`)
    pub fn base(&self) -> PathBuf {
        self.dir.path().join("feature")
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.base().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn fake_tool(&self) -> PathBuf {
        self.dir.path().join("fake-devcontainer")
    }

    pub fn tool_log(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Lines the fake tool logged, one per invocation
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.tool_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// A `devfeat` command rooted at this feature and wired to the fake tool
    pub fn devfeat(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("devfeat").unwrap();
        cmd.arg("--root")
            .arg(self.base())
            .arg("--devcontainer-path")
            .arg(self.fake_tool())
            .env("FAKE_DEVCONTAINER_LOG", self.tool_log())
            .env("DEVFEAT_SHELL", "sh")
            .env_remove("DEVFEAT_LOG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_fake_tool(&self) {
        let script = r#"#!/bin/sh
echo "$@" >> "$FAKE_DEVCONTAINER_LOG"
case "$1" in
  up)
    echo "fake build output"
    echo '{"outcome":"success","containerId":"fake123","remoteUser":"vscode"}'
    ;;
  exec)
    cd "$3" || exit 97
    shift 3
    exec "$@"
    ;;
esac
exit 0
"#;
        let path = self.fake_tool();
        fs::write(&path, script).unwrap();
        make_executable(&path);
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Value following `prefix` on the first stdout line that starts with it
pub fn line_value(stdout: &str, prefix: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|l| l.trim_start().strip_prefix(prefix))
        .map(|v| v.trim().to_string())
}
