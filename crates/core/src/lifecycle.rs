//! Container lifecycle tool abstraction
//!
//! The harness never talks to a container runtime itself; it drives the
//! `devcontainer` CLI (`up`, `exec`, `down`, ...) as a blocking subprocess per
//! step. [`LifecycleTool`] is the seam, [`DevcontainerCli`] the subprocess
//! implementation and [`mock::MockLifecycleTool`] a recording fake for tests.

use crate::errors::LifecycleError;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Captured result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Whether the command completed successfully (exit code 0)
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code
    pub fn failed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Turn an unsuccessful exit into [`LifecycleError::Failed`]
    pub fn into_result(self, command: &str) -> Result<ToolOutput, LifecycleError> {
        if self.success {
            Ok(self)
        } else {
            Err(LifecycleError::Failed {
                command: command.to_string(),
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Log level passed to `devcontainer up`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolLogLevel {
    Info,
    Debug,
}

impl ToolLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolLogLevel::Info => "info",
            ToolLogLevel::Debug => "debug",
        }
    }
}

/// External container-lifecycle tool
///
/// Implementations return `Ok` for every process that ran to completion,
/// successful or not; `Err` is reserved for spawn failures and timeouts.
#[allow(async_fn_in_trait)]
pub trait LifecycleTool {
    /// Build and start the environment described by `<workspace>/.devcontainer`
    async fn up(&self, workspace: &Path, log_level: ToolLogLevel)
        -> Result<ToolOutput, LifecycleError>;

    /// Run `command` inside the environment started from `workspace`
    async fn exec(&self, workspace: &Path, command: &[String])
        -> Result<ToolOutput, LifecycleError>;

    /// Tear down the environment started from `workspace`
    async fn down(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError>;

    /// Publish the feature sources in `source` to an OCI registry
    async fn features_publish(
        &self,
        source: &Path,
        registry: &str,
        namespace: &str,
    ) -> Result<ToolOutput, LifecycleError>;

    /// Open the environment started from `workspace` in an editor
    async fn open(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError>;
}

impl<T: LifecycleTool> LifecycleTool for &T {
    async fn up(
        &self,
        workspace: &Path,
        log_level: ToolLogLevel,
    ) -> Result<ToolOutput, LifecycleError> {
        (*self).up(workspace, log_level).await
    }

    async fn exec(
        &self,
        workspace: &Path,
        command: &[String],
    ) -> Result<ToolOutput, LifecycleError> {
        (*self).exec(workspace, command).await
    }

    async fn down(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
        (*self).down(workspace).await
    }

    async fn features_publish(
        &self,
        source: &Path,
        registry: &str,
        namespace: &str,
    ) -> Result<ToolOutput, LifecycleError> {
        (*self).features_publish(source, registry, namespace).await
    }

    async fn open(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
        (*self).open(workspace).await
    }
}

/// Time budgets for each kind of invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimeouts {
    pub up: Duration,
    pub exec: Duration,
    pub down: Duration,
    /// Used for `features publish` and `open`
    pub other: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            up: Duration::from_secs(1800),
            exec: Duration::from_secs(900),
            down: Duration::from_secs(300),
            other: Duration::from_secs(600),
        }
    }
}

/// Subprocess implementation driving the `devcontainer` CLI
#[derive(Debug, Clone)]
pub struct DevcontainerCli {
    program: String,
    timeouts: StepTimeouts,
}

impl Default for DevcontainerCli {
    fn default() -> Self {
        Self::new("devcontainer")
    }
}

impl DevcontainerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeouts: StepTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StepTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Shell-quoted rendering of an invocation, for logs and notices
    pub fn render_command(&self, args: &[String]) -> String {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(self.program.as_str());
        words.extend(args.iter().map(String::as_str));
        shell_words::join(words)
    }

    #[instrument(skip(self), fields(program = %self.program))]
    async fn run(&self, args: Vec<String>, limit: Duration) -> Result<ToolOutput, LifecycleError> {
        let rendered = self.render_command(&args);
        debug!("Running: {}", rendered);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LifecycleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout kills the child (kill_on_drop)
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| LifecycleError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                warn!("'{}' exceeded {}s, killed", rendered, limit.as_secs());
                return Err(LifecycleError::Timeout {
                    command: rendered,
                    seconds: limit.as_secs(),
                });
            }
        };

        let result = ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("'{}' exited with {}", rendered, result.exit_code);
        Ok(result)
    }
}

fn workspace_args(subcommand: &str, workspace: &Path) -> Vec<String> {
    vec![
        subcommand.to_string(),
        "--workspace-folder".to_string(),
        workspace.display().to_string(),
    ]
}

impl LifecycleTool for DevcontainerCli {
    async fn up(
        &self,
        workspace: &Path,
        log_level: ToolLogLevel,
    ) -> Result<ToolOutput, LifecycleError> {
        let mut args = workspace_args("up", workspace);
        args.push("--log-level".to_string());
        args.push(log_level.as_str().to_string());
        self.run(args, self.timeouts.up).await
    }

    async fn exec(
        &self,
        workspace: &Path,
        command: &[String],
    ) -> Result<ToolOutput, LifecycleError> {
        let mut args = workspace_args("exec", workspace);
        args.extend(command.iter().cloned());
        self.run(args, self.timeouts.exec).await
    }

    async fn down(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
        self.run(workspace_args("down", workspace), self.timeouts.down)
            .await
    }

    async fn features_publish(
        &self,
        source: &Path,
        registry: &str,
        namespace: &str,
    ) -> Result<ToolOutput, LifecycleError> {
        let args = vec![
            "features".to_string(),
            "publish".to_string(),
            source.display().to_string(),
            "--registry".to_string(),
            registry.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        self.run(args, self.timeouts.other).await
    }

    async fn open(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
        let args = vec!["open".to_string(), workspace.display().to_string()];
        self.run(args, self.timeouts.other).await
    }
}

/// The JSON result line printed by `devcontainer up`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpResult {
    pub outcome: String,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub remote_user: Option<String>,
}

/// Find the last line of `stdout` that parses as an [`UpResult`]
pub fn parse_up_result(stdout: &str) -> Option<UpResult> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

pub mod mock {
    //! Recording fake of the lifecycle tool
    //!
    //! Responses are scripted per operation: queued responses are consumed
    //! first, then the operation's default applies. Every call is recorded,
    //! and `up` additionally snapshots the staged `devcontainer.json` so
    //! tests can inspect it after the workspace is gone.

    use super::{LifecycleTool, ToolLogLevel, ToolOutput};
    use crate::errors::LifecycleError;
    use std::collections::{HashMap, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Operation kinds
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ToolOp {
        Up,
        Exec,
        Down,
        Publish,
        Open,
    }

    /// Scripted response
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        Output(ToolOutput),
        Timeout,
        SpawnFailure,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Output(ToolOutput::ok(""))
        }
    }

    /// A recorded invocation
    #[derive(Debug, Clone)]
    pub struct ToolCall {
        pub op: ToolOp,
        pub path: PathBuf,
        pub args: Vec<String>,
        /// `devcontainer.json` content at the time of an `up` call
        pub config: Option<String>,
        /// Whether `test.sh` existed in the workspace at the time of the call
        pub test_script_present: bool,
    }

    #[derive(Debug, Default)]
    struct Script {
        defaults: HashMap<ToolOp, MockResponse>,
        queued: HashMap<ToolOp, VecDeque<MockResponse>>,
    }

    #[derive(Debug, Default)]
    pub struct MockLifecycleTool {
        script: Mutex<Script>,
        calls: Mutex<Vec<ToolCall>>,
    }

    impl MockLifecycleTool {
        pub fn new() -> Self {
            Self::default()
        }

        /// Response used for `op` whenever nothing is queued
        pub fn respond(&self, op: ToolOp, response: MockResponse) -> &Self {
            if let Ok(mut script) = self.script.lock() {
                script.defaults.insert(op, response);
            }
            self
        }

        /// Queue a one-shot response for the next `op` call
        pub fn queue(&self, op: ToolOp, response: MockResponse) -> &Self {
            if let Ok(mut script) = self.script.lock() {
                script.queued.entry(op).or_default().push_back(response);
            }
            self
        }

        /// All recorded calls, in order
        pub fn calls(&self) -> Vec<ToolCall> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        /// Recorded calls of one kind
        pub fn calls_of(&self, op: ToolOp) -> Vec<ToolCall> {
            self.calls().into_iter().filter(|c| c.op == op).collect()
        }

        fn record(
            &self,
            op: ToolOp,
            path: &Path,
            args: Vec<String>,
        ) -> Result<ToolOutput, LifecycleError> {
            let config = (op == ToolOp::Up)
                .then(|| std::fs::read_to_string(path.join(".devcontainer/devcontainer.json")).ok())
                .flatten();
            let call = ToolCall {
                op,
                path: path.to_path_buf(),
                args,
                config,
                test_script_present: path.join("test.sh").is_file(),
            };
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }

            let response = self
                .script
                .lock()
                .ok()
                .and_then(|mut script| {
                    script
                        .queued
                        .get_mut(&op)
                        .and_then(VecDeque::pop_front)
                        .or_else(|| script.defaults.get(&op).cloned())
                })
                .unwrap_or_default();

            match response {
                MockResponse::Output(output) => Ok(output),
                MockResponse::Timeout => Err(LifecycleError::Timeout {
                    command: format!("devcontainer {op:?}").to_lowercase(),
                    seconds: 0,
                }),
                MockResponse::SpawnFailure => Err(LifecycleError::Spawn {
                    program: "devcontainer".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock"),
                }),
            }
        }
    }

    impl LifecycleTool for MockLifecycleTool {
        async fn up(
            &self,
            workspace: &Path,
            log_level: ToolLogLevel,
        ) -> Result<ToolOutput, LifecycleError> {
            self.record(ToolOp::Up, workspace, vec![log_level.as_str().to_string()])
        }

        async fn exec(
            &self,
            workspace: &Path,
            command: &[String],
        ) -> Result<ToolOutput, LifecycleError> {
            self.record(ToolOp::Exec, workspace, command.to_vec())
        }

        async fn down(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
            self.record(ToolOp::Down, workspace, Vec::new())
        }

        async fn features_publish(
            &self,
            source: &Path,
            registry: &str,
            namespace: &str,
        ) -> Result<ToolOutput, LifecycleError> {
            self.record(
                ToolOp::Publish,
                source,
                vec![registry.to_string(), namespace.to_string()],
            )
        }

        async fn open(&self, workspace: &Path) -> Result<ToolOutput, LifecycleError> {
            self.record(ToolOp::Open, workspace, Vec::new())
        }
    }
}
