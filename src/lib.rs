//! ddevstan: PHPStan diagnostics for DDEV projects.
//!
//! Runs PHPStan inside a project's DDEV container, interprets its JSON
//! output, and surfaces the findings either over the Language Server
//! Protocol (`ddevstan server`) or as a one-shot check (`ddevstan check`).
//! Both surfaces share one pipeline: validate the environment, build the
//! argument vector, execute in the container, interpret the output, map the
//! findings onto diagnostics.

pub mod config;
pub mod ddev;
pub mod diagnostics;
pub mod exit_codes;
pub mod lsp;
pub mod phpstan;

use std::fmt;

pub use config::Config;
pub use ddev::{DdevClient, ExecError, ValidationErrorKind, ValidationOutcome};

use phpstan::Interpretation;

/// Why an analysis run produced no interpretation.
#[derive(Debug)]
pub enum AnalysisError {
    /// Environment validation failed before anything ran.
    Invalid {
        kind: ValidationErrorKind,
        message: String,
    },
    /// PHPStan exited with a disallowed code or could not be spawned.
    Exec(ExecError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Invalid { message, .. } => write!(f, "{message}"),
            AnalysisError::Exec(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Invalid { .. } => None,
            AnalysisError::Exec(err) => Some(err),
        }
    }
}

/// One invocation's untouched output, for the debug surface.
#[derive(Debug)]
pub struct RawAnalysis {
    /// The full command line that ran.
    pub command: String,
    /// Raw stdout exactly as PHPStan produced it.
    pub output: String,
}

/// Validate, build, and execute, returning the raw output untouched.
pub async fn analyze_file_raw(
    client: &DdevClient,
    config: &Config,
    relative_path: &str,
) -> Result<RawAnalysis, AnalysisError> {
    match client.validate_tool(phpstan::TOOL_NAME).await {
        ValidationOutcome::Valid => {}
        ValidationOutcome::Invalid { kind, message } => {
            return Err(AnalysisError::Invalid { kind, message });
        }
    }

    let args = phpstan::build_args(config, client.workspace_root(), relative_path);
    let command = client.command_line(&args);
    log::info!("running {command}");

    let output = client
        .exec(&args, phpstan::ALLOWED_EXIT_CODES)
        .await
        .map_err(AnalysisError::Exec)?;
    log::debug!("PHPStan produced {} bytes of output", output.len());

    Ok(RawAnalysis { command, output })
}

/// Run the full analysis pipeline for one file.
///
/// `relative_path` is the file PHPStan is asked to analyze, relative to the
/// workspace root. The configuration is taken as-is; callers re-read
/// settings before each run. The caller decides how to present the returned
/// [`Interpretation`].
pub async fn analyze_file(
    client: &DdevClient,
    config: &Config,
    relative_path: &str,
) -> Result<Interpretation, AnalysisError> {
    let raw = analyze_file_raw(client, config, relative_path).await?;
    let absolute = client.workspace_root().join(relative_path);
    Ok(phpstan::interpret(
        &raw.output,
        &absolute,
        relative_path,
        config.min_severity,
    ))
}
