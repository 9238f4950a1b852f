//! DDEV container integration: sandboxed command execution and environment
//! validation.
//!
//! Every tool invocation goes through `ddev exec` with Xdebug forced off, and
//! every validation call re-probes the environment from scratch so a stopped
//! or restarted container is picked up on the next run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Marker file denoting a DDEV project, relative to the workspace root.
pub const PROJECT_MARKER: &str = ".ddev/config.yaml";

/// Xdebug slows PHPStan by an order of magnitude and can leak warnings into
/// stdout, so it is disabled for every exec.
const XDEBUG_OVERRIDE: &str = "XDEBUG_MODE=off";

const DEFAULT_RUNTIME: &str = "ddev";

/// A command run inside the container exited with a disallowed code, or
/// could not be spawned at all.
#[derive(Debug)]
pub struct ExecError {
    /// Exit status; `None` when the runtime binary could not be spawned or
    /// the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured stdout, kept even on failure for diagnostic purposes.
    pub stdout: String,
    /// Captured stderr, or the spawn error text.
    pub stderr: String,
    /// The full command line that was attempted.
    pub command: String,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "command `{}` exited with code {}", self.command, code),
            None => write!(f, "failed to run `{}`: {}", self.command, self.stderr.trim()),
        }
    }
}

impl std::error::Error for ExecError {}

/// Why the environment cannot run a tool right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No workspace root is available at all.
    NoWorkspace,
    /// The workspace has no `.ddev/config.yaml`.
    NoDdevProject,
    /// The project exists but the container runtime is not reachable.
    DdevNotRunning,
    /// The runtime is reachable but the tool is not installed in it.
    ToolNotFound,
    /// Anything else.
    Unknown,
}

/// Result of [`DdevClient::validate_tool`]. Produced fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid {
        kind: ValidationErrorKind,
        message: String,
    },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Handle on one workspace's DDEV project.
///
/// Cheap to construct; holds no connection state. The runtime command is a
/// field so tests and exotic setups can substitute the binary.
#[derive(Debug, Clone)]
pub struct DdevClient {
    workspace_root: PathBuf,
    runtime: String,
}

impl DdevClient {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            runtime: DEFAULT_RUNTIME.to_string(),
        }
    }

    pub fn with_runtime(workspace_root: impl Into<PathBuf>, runtime: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            runtime: runtime.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The full command line `exec` would run, for logging and error output.
    pub fn command_line<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut rendered = format!("{} exec env {}", self.runtime, XDEBUG_OVERRIDE);
        for arg in args {
            rendered.push(' ');
            rendered.push_str(arg.as_ref());
        }
        rendered
    }

    /// Run an argument vector inside the container.
    ///
    /// Arguments are passed through as a vector, never joined into a shell
    /// string. Returns captured stdout when the exit code is in
    /// `allowed_exit_codes`, even for non-zero codes (PHPStan reports
    /// "findings present" via exit code 1). A single attempt, no retry.
    pub async fn exec<S: AsRef<str>>(
        &self,
        args: &[S],
        allowed_exit_codes: &[i32],
    ) -> Result<String, ExecError> {
        let command = self.command_line(args);
        let output = Command::new(&self.runtime)
            .arg("exec")
            .arg("env")
            .arg(XDEBUG_OVERRIDE)
            .args(args.iter().map(|a| a.as_ref()))
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| ExecError {
                status: None,
                stdout: String::new(),
                stderr: err.to_string(),
                command: command.clone(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let status = output.status.code();

        match status {
            Some(code) if allowed_exit_codes.contains(&code) => {
                if code != 0 {
                    log::debug!("command exited with allowed code {code}: {command}");
                }
                Ok(stdout)
            }
            _ => Err(ExecError {
                status,
                stdout,
                stderr,
                command,
            }),
        }
    }

    /// Whether the workspace is configured as a DDEV project. A pure
    /// filesystem check, no container round-trip.
    pub fn has_project(&self) -> bool {
        self.workspace_root.join(PROJECT_MARKER).is_file()
    }

    /// Whether the container runtime responds to a trivial command.
    pub async fn is_running(&self) -> bool {
        self.exec(&["echo", "ok"], &[0]).await.is_ok()
    }

    /// Whether `tool` is installed inside the container.
    pub async fn is_tool_installed(&self, tool: &str) -> bool {
        self.exec(&[tool, "--version"], &[0]).await.is_ok()
    }

    /// Validate that `tool` can run in this workspace.
    ///
    /// Checks are strictly ordered and short-circuit: the project marker
    /// first (avoids a wasted round-trip into a container that is known not
    /// to exist), then the tool probe, and only on its failure a runtime
    /// probe to tell "container stopped" apart from "tool missing".
    pub async fn validate_tool(&self, tool: &str) -> ValidationOutcome {
        if !self.has_project() {
            return ValidationOutcome::Invalid {
                kind: ValidationErrorKind::NoDdevProject,
                message: "No DDEV project found".to_string(),
            };
        }

        if self.is_tool_installed(tool).await {
            return ValidationOutcome::Valid;
        }

        if !self.is_running().await {
            return ValidationOutcome::Invalid {
                kind: ValidationErrorKind::DdevNotRunning,
                message: format!(
                    "DDEV project appears to be stopped. Please start DDEV with 'ddev start' to use {tool}."
                ),
            };
        }

        let package = composer_package(tool);
        ValidationOutcome::Invalid {
            kind: ValidationErrorKind::ToolNotFound,
            message: format!(
                "{tool} is not installed in the DDEV container. Install it with: ddev composer require --dev {package}"
            ),
        }
    }

    /// Start the DDEV project. Runs `ddev start` directly on the host, not
    /// through `exec`.
    pub async fn start(&self) -> Result<(), ExecError> {
        let command = format!("{} start", self.runtime);
        let output = Command::new(&self.runtime)
            .arg("start")
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| ExecError {
                status: None,
                stdout: String::new(),
                stderr: err.to_string(),
                command: command.clone(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ExecError {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                command,
            })
        }
    }
}

/// Composer package that provides a tool, for installation hints. Unknown
/// tools fall back to a same-named vendor guess.
pub fn composer_package(tool: &str) -> String {
    match tool {
        "phpmd" => "phpmd/phpmd".to_string(),
        "phpcs" => "squizlabs/php_codesniffer".to_string(),
        "phpstan" => "phpstan/phpstan".to_string(),
        other => format!("{other}/{other}"),
    }
}
