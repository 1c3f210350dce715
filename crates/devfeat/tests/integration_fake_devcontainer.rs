//! End-to-end CLI tests against a fake `devcontainer` executable
//!
//! The fake logs every invocation and runs `exec` commands on the host in
//! the scenario workspace, so the real `test.sh` decides pass or fail.

mod common;

use common::{line_value, FeatureEnv};
use predicates::prelude::*;
use serial_test::serial;
use std::path::Path;

#[test]
#[serial]
fn test_all_scenarios_pass() {
    let env = FeatureEnv::new();
    env.write(
        "test/test.sh",
        "grep -q '\"./src\"' .devcontainer/devcontainer.json && echo verified\n",
    );

    env.devfeat()
        .arg("test")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: devfeat test"))
        .stdout(predicate::str::contains("📊 Scenarios to test: basic, minimal"))
        .stdout(predicate::str::contains("✅ Scenario 'basic' passed"))
        .stdout(predicate::str::contains("✅ Scenario 'minimal' passed"))
        .stdout(predicate::str::contains("Total scenarios: 2"))
        .stdout(predicate::str::contains("🎉 All tests passed"));

    let calls = env.calls();
    let ops: Vec<&str> = calls
        .iter()
        .map(|c| c.split_whitespace().next().unwrap_or_default())
        .collect();
    assert_eq!(ops, vec!["up", "exec", "down", "up", "exec", "down"]);
    assert!(calls[0].ends_with("--log-level info"));
    assert!(calls[1].ends_with("sh test.sh"));

    // workspaces are removed after teardown
    let workspace = calls[0].split_whitespace().nth(2).unwrap();
    assert!(!Path::new(workspace).exists());
}

#[test]
#[serial]
fn test_failing_script_exits_1_and_truncates() {
    let env = FeatureEnv::new();
    env.write(
        "test/test.sh",
        "i=1\nwhile [ $i -le 40 ]; do echo \"line $i\"; i=$((i+1)); done\nexit 3\n",
    );

    env.devfeat()
        .args(["test", "basic"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("❌ Scenario 'basic' failed"))
        .stdout(predicate::str::contains("Test output (truncated):"))
        .stdout(predicate::str::contains("line 30\n"))
        .stdout(predicate::str::contains("line 31").not())
        .stdout(predicate::str::contains("Tips for debugging failures"))
        .stdout(predicate::str::contains("Usage: devfeat test").not())
        .stderr(predicate::str::contains("1 of 1 scenario(s) failed"));

    // only the requested scenario ran, and it was still torn down
    let calls = env.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].starts_with("down --workspace-folder"));
}

#[test]
#[serial]
fn test_missing_test_script_passes() {
    let env = FeatureEnv::new();

    env.devfeat()
        .args(["test", "minimal", "--no-common-utils"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No test script found"))
        .stdout(predicate::str::contains("Common utilities").not());

    assert!(env.calls().iter().all(|c| !c.starts_with("exec")));
}

#[test]
#[serial]
fn test_no_cleanup_preserves_workspace() {
    let env = FeatureEnv::new();

    let output = env
        .devfeat()
        .args(["test", "basic", "--no-cleanup"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let kept = line_value(&stdout, "📁 Test files preserved at:").unwrap();
    let kept = Path::new(&kept);
    let config: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(kept.join(".devcontainer/devcontainer.json")).unwrap(),
    )
    .unwrap();

    assert_eq!(config["name"], "test-my-feature-basic");
    let keys: Vec<&String> = config["features"].as_object().unwrap().keys().collect();
    assert_eq!(
        keys,
        vec!["ghcr.io/devcontainers/features/common-utils:2", "./src"]
    );
    assert_eq!(config["containerEnv"]["FLAG"], "true");
    assert!(kept.join(".devcontainer/src/install.sh").is_file());
    assert!(env.calls().iter().all(|c| !c.starts_with("down")));

    std::fs::remove_dir_all(kept).unwrap();
}

#[test]
#[serial]
fn test_verbose_passes_debug_log_level() {
    let env = FeatureEnv::new();
    env.write("test/test.sh", "echo from-test-script\n");

    env.devfeat()
        .args(["test", "minimal", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-test-script"));

    assert!(env.calls()[0].ends_with("--log-level debug"));
}

#[test]
#[serial]
fn test_publish_runs_features_publish() {
    let env = FeatureEnv::new();

    env.devfeat()
        .args(["publish", "--namespace", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "✅ Successfully published my-feature:0.3.0",
        ))
        .stdout(predicate::str::contains(
            "📖 Usage: \"ghcr.io/acme/my-feature:0.3.0\"",
        ));

    let calls = env.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        format!(
            "features publish {} --registry ghcr.io --namespace acme",
            env.base().join("src").display()
        )
    );
}

#[test]
#[serial]
fn test_live_starts_environment() {
    let env = FeatureEnv::new();
    env.write(
        "src/.devcontainer/devcontainer.json",
        r#"{"image": "ubuntu:22.04", "features": {"./feature": {}}}"#,
    );

    let output = env.devfeat().args(["live", "--open"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("📦 Container: fake123"));
    let workspace = line_value(&stdout, "📁 Workspace:").unwrap();
    let workspace = Path::new(&workspace);
    assert!(workspace
        .join(".devcontainer/feature/install.sh")
        .is_file());

    let calls = env.calls();
    assert!(calls[0].starts_with("up --workspace-folder"));
    assert!(calls[1].starts_with("open "));

    std::fs::remove_dir_all(workspace).unwrap();
}
