//! Scenario test runner
//!
//! Drives one feature's scenario catalog through the lifecycle tool:
//! stage a workspace, `up`, optionally `exec` the verification script, then
//! tear down. Per-scenario failures are recorded and never abort the loop.

use crate::errors::{ConfigError, LifecycleError, Result};
use crate::feature::{load_feature_descriptor, FeatureDescriptor};
use crate::layout::FeatureLayout;
use crate::lifecycle::{LifecycleTool, ToolLogLevel};
use crate::report::Reporter;
use crate::scenario::{load_scenario_catalog, Scenario, ScenarioCatalog};
use crate::staging::ScenarioWorkspace;
use crate::synth::{FeatureSetPlan, SynthOptions, SynthesizedConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A validated feature directory with its parsed descriptor and catalog
#[derive(Debug, Clone)]
pub struct FeatureSuite {
    pub layout: FeatureLayout,
    pub descriptor: FeatureDescriptor,
    pub catalog: ScenarioCatalog,
}

impl FeatureSuite {
    /// Validate the layout under `base` and parse both input files
    #[instrument(level = "debug")]
    pub fn load(base: &Path) -> Result<Self> {
        let layout = FeatureLayout::discover(base)?;
        let descriptor = load_feature_descriptor(&layout.descriptor_path())?;
        let catalog = load_scenario_catalog(&layout.scenarios_path())?;
        debug!(
            "Loaded feature '{}' with {} scenarios",
            descriptor.id,
            catalog.len()
        );
        Ok(Self {
            layout,
            descriptor,
            catalog,
        })
    }

    pub fn feature_id(&self) -> &str {
        &self.descriptor.id
    }

    /// Scenarios to run for an optional explicit selection
    pub fn select(
        &self,
        name: Option<&str>,
    ) -> std::result::Result<Vec<(&str, &Scenario)>, ConfigError> {
        self.catalog.select(name)
    }
}

/// Run configuration threaded through every scenario step
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub verbose: bool,
    pub no_cleanup: bool,
    pub include_common_utils: bool,
    /// Shell used as `<shell> test.sh`
    pub shell: String,
    pub remote_user: String,
    pub output_line_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            no_cleanup: false,
            include_common_utils: true,
            shell: "bash".to_string(),
            remote_user: "vscode".to_string(),
            output_line_limit: 30,
        }
    }
}

impl RunOptions {
    fn synth_options(&self) -> SynthOptions {
        SynthOptions {
            include_common_utils: self.include_common_utils,
            remote_user: self.remote_user.clone(),
        }
    }

    fn tool_log_level(&self) -> ToolLogLevel {
        if self.verbose {
            ToolLogLevel::Debug
        } else {
            ToolLogLevel::Info
        }
    }
}

/// Classified result of one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// `test.sh` ran and exited zero
    Passed,
    /// The environment came up and there was no `test.sh` to run
    PassedWithoutTests,
    /// Setup failed before `test.sh` could run
    SetupFailed { reason: String },
    /// `test.sh` exited non-zero or could not be run to completion
    TestFailed {
        exit_code: Option<i32>,
        reason: String,
    },
}

impl ScenarioOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed | Self::PassedWithoutTests)
    }
}

/// One scenario's outcome plus bookkeeping
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub outcome: ScenarioOutcome,
    pub duration: Duration,
    /// Workspace kept on disk with `--no-cleanup`
    pub preserved_at: Option<PathBuf>,
}

/// Outcome tally for a whole run
#[derive(Debug, Clone, Default)]
pub struct TestRunSummary {
    pub results: Vec<ScenarioResult>,
}

impl TestRunSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Names of failed scenarios, in run order
    pub fn failed_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Runs scenarios one after another against a lifecycle tool
pub struct ScenarioRunner<'a, T: LifecycleTool> {
    tool: T,
    suite: &'a FeatureSuite,
    options: RunOptions,
}

impl<'a, T: LifecycleTool> ScenarioRunner<'a, T> {
    pub fn new(tool: T, suite: &'a FeatureSuite, options: RunOptions) -> Self {
        Self {
            tool,
            suite,
            options,
        }
    }

    /// Run the selected scenarios in order and return the tally.
    ///
    /// An unknown explicit scenario name fails before any container work.
    pub async fn run(
        &self,
        selection: Option<&str>,
        reporter: &mut Reporter,
    ) -> Result<TestRunSummary> {
        let selected = self.suite.select(selection)?;
        let names: Vec<&str> = selected.iter().map(|(name, _)| *name).collect();
        reporter.run_header(
            self.suite.feature_id(),
            &names,
            self.options.include_common_utils,
        );

        let mut summary = TestRunSummary::default();
        for (name, scenario) in selected {
            let result = self.run_scenario(name, scenario, reporter).await;
            summary.results.push(result);
        }

        info!(
            "Feature '{}': {} passed, {} failed",
            self.suite.feature_id(),
            summary.passed(),
            summary.failed()
        );
        reporter.summary(self.suite.feature_id(), &summary);
        Ok(summary)
    }

    /// Run one scenario; every error is folded into the outcome
    #[instrument(level = "debug", skip(self, scenario, reporter), fields(feature = %self.suite.feature_id()))]
    pub async fn run_scenario(
        &self,
        name: &str,
        scenario: &Scenario,
        reporter: &mut Reporter,
    ) -> ScenarioResult {
        let started = Instant::now();
        reporter.scenario_header(name, &scenario.image);

        let workspace = match ScenarioWorkspace::create(self.suite.feature_id()) {
            Ok(workspace) => workspace,
            Err(e) => {
                let outcome = ScenarioOutcome::SetupFailed {
                    reason: format!("Failed to create workspace: {e}"),
                };
                self.report_outcome(name, &outcome, reporter);
                return ScenarioResult {
                    name: name.to_string(),
                    outcome,
                    duration: started.elapsed(),
                    preserved_at: None,
                };
            }
        };

        let outcome = self.exercise(name, scenario, &workspace, reporter).await;
        self.report_outcome(name, &outcome, reporter);

        let preserved_at = self.cleanup(workspace, reporter).await;
        reporter.blank();

        ScenarioResult {
            name: name.to_string(),
            outcome,
            duration: started.elapsed(),
            preserved_at,
        }
    }

    async fn exercise(
        &self,
        name: &str,
        scenario: &Scenario,
        workspace: &ScenarioWorkspace,
        reporter: &mut Reporter,
    ) -> ScenarioOutcome {
        let config = SynthesizedConfig::synthesize(
            &self.suite.descriptor,
            name,
            scenario,
            &self.options.synth_options(),
        );
        if let Err(e) = workspace.stage(&config, &self.suite.layout.source_dir()) {
            return ScenarioOutcome::SetupFailed {
                reason: format!("Failed to stage workspace: {e}"),
            };
        }
        if self.options.verbose {
            self.show_config(scenario, &config, reporter);
        }

        reporter.line("🏗️  Building container with feature...");
        let up = self
            .tool
            .up(workspace.path(), self.options.tool_log_level())
            .await
            .and_then(|output| output.into_result("devcontainer up"));
        if let Err(e) = up {
            self.show_error_output(&e, reporter);
            return ScenarioOutcome::SetupFailed {
                reason: e.to_string(),
            };
        }

        let Some(script) = self.suite.layout.test_script() else {
            reporter.line(format!(
                "⚠️  No test script found at {}",
                self.suite.layout.test_script_path().display()
            ));
            return ScenarioOutcome::PassedWithoutTests;
        };

        if let Err(e) = workspace.install_test_script(&script) {
            return ScenarioOutcome::SetupFailed {
                reason: format!("Failed to copy test script: {e}"),
            };
        }

        reporter.line("🧪 Running tests...");
        let command = vec![self.options.shell.clone(), "test.sh".to_string()];
        match self.tool.exec(workspace.path(), &command).await {
            Ok(output) if output.success => {
                if self.options.verbose {
                    if !output.stdout.is_empty() {
                        reporter.test_output(&output.stdout, self.options.output_line_limit, true);
                    }
                    if !output.stderr.trim().is_empty() {
                        reporter.line("Test stderr:");
                        reporter.line(output.stderr.trim_end());
                    }
                }
                ScenarioOutcome::Passed
            }
            Ok(output) => {
                let combined = combine_output(&output.stdout, &output.stderr);
                reporter.test_output(
                    &combined,
                    self.options.output_line_limit,
                    self.options.verbose,
                );
                ScenarioOutcome::TestFailed {
                    exit_code: Some(output.exit_code),
                    reason: format!("test.sh exited with code {}", output.exit_code),
                }
            }
            Err(e) => {
                self.show_error_output(&e, reporter);
                ScenarioOutcome::TestFailed {
                    exit_code: None,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Dependency notices and the generated `devcontainer.json`
    fn show_config(
        &self,
        scenario: &Scenario,
        config: &SynthesizedConfig,
        reporter: &mut Reporter,
    ) {
        let plan = FeatureSetPlan::for_scenario(
            &self.suite.descriptor,
            scenario,
            self.options.include_common_utils,
        );
        for dependency in plan.added_dependencies() {
            reporter.line(format!("📦 Adding dependency: {dependency}"));
        }
        reporter.line("📄 Generated devcontainer.json:");
        reporter.line(config.to_json_pretty());
        reporter.blank();
    }

    fn show_error_output(&self, error: &LifecycleError, reporter: &mut Reporter) {
        let stdout = error.stdout().unwrap_or_default();
        let stderr = error.stderr().unwrap_or_default();
        let combined = combine_output(stdout, stderr);
        if !combined.trim().is_empty() {
            reporter.test_output(
                &combined,
                self.options.output_line_limit,
                self.options.verbose,
            );
        }
    }

    fn report_outcome(&self, name: &str, outcome: &ScenarioOutcome, reporter: &mut Reporter) {
        match outcome {
            ScenarioOutcome::Passed => {
                reporter.line(format!("✅ Scenario '{name}' passed"));
            }
            ScenarioOutcome::PassedWithoutTests => {
                reporter.line("✅ Build successful (no tests to run)");
            }
            ScenarioOutcome::SetupFailed { reason } => {
                reporter.line(format!("❌ Scenario '{name}' failed during setup: {reason}"));
                if !self.options.verbose {
                    reporter.line("   Run with --verbose for full output");
                }
            }
            ScenarioOutcome::TestFailed { reason, .. } => {
                reporter.line(format!("❌ Scenario '{name}' failed: {reason}"));
            }
        }
    }

    /// Tear down the environment and remove the workspace, or keep both
    async fn cleanup(
        &self,
        workspace: ScenarioWorkspace,
        reporter: &mut Reporter,
    ) -> Option<PathBuf> {
        if self.options.no_cleanup {
            let path = workspace.retain();
            reporter.preserved(&path);
            return Some(path);
        }

        reporter.line("🧹 Cleaning up...");
        let down = self
            .tool
            .down(workspace.path())
            .await
            .and_then(|output| output.into_result("devcontainer down"));
        if let Err(e) = down {
            if self.options.verbose {
                warn!("Teardown failed: {}", e);
            } else {
                debug!("Teardown failed: {}", e);
            }
        }
        if let Err(e) = workspace.remove() {
            debug!("Failed to remove workspace: {}", e);
        }
        None
    }
}

fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (true, true) => String::new(),
    }
}
