//! Test command implementation
//!
//! Implements `devfeat test`: validate the feature layout, then run the
//! selected scenarios through the devcontainer CLI and report the tally.

use super::devcontainer_cli;
use anyhow::Result;
use devfeat_core::errors::{ConfigError, HarnessError};
use devfeat_core::report::Reporter;
use devfeat_core::runner::{FeatureSuite, RunOptions, ScenarioRunner};
use devfeat_core::settings::Settings;
use std::path::Path;
use tracing::{debug, instrument};

/// Test command arguments
#[derive(Debug, Clone, Default)]
pub struct TestArgs {
    /// Run only this scenario
    pub scenario: Option<String>,
    pub verbose: bool,
    pub no_cleanup: bool,
    pub list_scenarios: bool,
    pub no_common_utils: bool,
    /// Overrides the `up` and `exec` time budgets, in seconds
    pub timeout: Option<u64>,
}

/// Error used to signal that at least one scenario failed
#[derive(Debug)]
pub struct ScenarioFailures {
    pub failed: usize,
    pub total: usize,
}

impl std::fmt::Display for ScenarioFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} scenario(s) failed", self.failed, self.total)
    }
}

impl std::error::Error for ScenarioFailures {}

/// Execute the test command
#[instrument(skip(args, settings))]
pub async fn execute_test(args: TestArgs, base: &Path, settings: &Settings) -> Result<()> {
    debug!("Test args: {:?}", args);
    let mut reporter = Reporter::stdout();

    let suite = match FeatureSuite::load(base) {
        Ok(suite) => suite,
        Err(HarnessError::Structure(e)) => {
            reporter.invalid_structure(&e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if args.list_scenarios {
        reporter.listing(suite.feature_id(), &suite.catalog);
        return Ok(());
    }

    if args.scenario.is_none() {
        let first = suite.catalog.names().next();
        reporter.usage(suite.feature_id(), first);
    }

    let mut settings = settings.clone();
    if let Some(secs) = args.timeout {
        settings.up_timeout_secs = secs;
        settings.exec_timeout_secs = secs;
    }
    debug!(
        "Step timeouts: up={:?} exec={:?} down={:?}",
        settings.up_timeout(),
        settings.exec_timeout(),
        settings.down_timeout()
    );

    let options = RunOptions {
        verbose: args.verbose,
        no_cleanup: args.no_cleanup,
        include_common_utils: settings.common_utils && !args.no_common_utils,
        shell: settings.shell.clone(),
        remote_user: settings.remote_user.clone(),
        output_line_limit: settings.output_line_limit,
    };

    let tool = devcontainer_cli(&settings);
    let runner = ScenarioRunner::new(&tool, &suite, options);
    let summary = match runner.run(args.scenario.as_deref(), &mut reporter).await {
        Ok(summary) => summary,
        Err(HarnessError::Config(ConfigError::UnknownScenario { name, .. })) => {
            reporter.unknown_scenario(&name, &suite.catalog);
            return Err(anyhow::anyhow!("Scenario '{}' not found", name));
        }
        Err(e) => return Err(e.into()),
    };

    if summary.all_passed() {
        Ok(())
    } else {
        Err(ScenarioFailures {
            failed: summary.failed(),
            total: summary.total(),
        }
        .into())
    }
}
