use crate::commands::live::{execute_live, LiveArgs};
use crate::commands::publish::{execute_publish, PublishArgs};
use crate::commands::test::{execute_test, TestArgs};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use devfeat_core::layout::resolve_base_dir;
use devfeat_core::settings::Settings;
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Devcontainer feature test harness
#[derive(Debug, Parser)]
#[command(name = "devfeat", version, about, long_about = None)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via DEVFEAT_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level (defaults to info, or debug with `test --verbose`)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Feature directory (defaults to the current directory when it is named
    /// `feature`, otherwise `./feature`)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Path to the devcontainer CLI executable
    #[arg(long, global = true, value_name = "PATH")]
    pub devcontainer_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// devfeat subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the feature's test scenarios
    Test {
        /// Run only this scenario
        scenario: Option<String>,
        /// Show full tool and test output
        #[arg(long)]
        verbose: bool,
        /// Keep containers and generated files after each scenario
        #[arg(long)]
        no_cleanup: bool,
        /// List available scenarios and exit
        #[arg(long)]
        list_scenarios: bool,
        /// Skip installing the common-utils feature
        #[arg(long)]
        no_common_utils: bool,
        /// Time budget in seconds for each `up` and `exec` call
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Publish the feature to an OCI registry
    Publish {
        /// Target registry
        #[arg(long, default_value = devfeat_core::publish::DEFAULT_REGISTRY)]
        registry: String,
        /// Registry namespace, e.g. `org/features`
        #[arg(long)]
        namespace: String,
        /// Print what would be published without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Start a long-running environment with the feature installed
    Live {
        /// Open the workspace after it starts
        #[arg(long)]
        open: bool,
    },
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        // Initialize logging based on global options
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let verbose = matches!(self.command, Commands::Test { verbose: true, .. });
        let log_level = match self.log_level {
            Some(level) => level.as_str(),
            None if verbose => "debug",
            None => "info",
        };

        // Set environment variable for log level before initializing logging
        if std::env::var_os(devfeat_core::logging::LOG_FILTER_ENV).is_none()
            && std::env::var_os("RUST_LOG").is_none()
        {
            std::env::set_var(
                "RUST_LOG",
                format!("devfeat={},devfeat_core={}", log_level, log_level),
            );
        }
        devfeat_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let base = resolve_base_dir(self.root.as_deref(), &cwd);
        tracing::debug!("Feature base directory: {}", base.display());

        let mut settings = Settings::load(&base)
            .with_context(|| format!("Failed to load settings for {}", base.display()))?;
        if let Some(path) = self.devcontainer_path {
            settings.devcontainer_path = path;
        }

        match self.command {
            Commands::Test {
                scenario,
                verbose,
                no_cleanup,
                list_scenarios,
                no_common_utils,
                timeout,
            } => {
                let args = TestArgs {
                    scenario,
                    verbose,
                    no_cleanup,
                    list_scenarios,
                    no_common_utils,
                    timeout,
                };
                execute_test(args, &base, &settings).await
            }
            Commands::Publish {
                registry,
                namespace,
                dry_run,
            } => {
                let args = PublishArgs {
                    registry,
                    namespace,
                    dry_run,
                };
                execute_publish(args, &base, &settings).await
            }
            Commands::Live { open } => execute_live(LiveArgs { open }, &base, &settings).await,
        }
    }
}
