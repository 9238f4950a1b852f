//! Configuration structures and loading logic for ddevstan.
//!
//! The same [`Config`] is read from `.ddevstan.toml` at the workspace root on
//! the CLI path and from initialization options / `didChangeConfiguration`
//! settings on the LSP path. Settings are re-read at the start of every
//! analysis run, never cached across runs.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;
use tower_lsp::lsp_types::DiagnosticSeverity;

/// Workspace config file probed by the CLI.
pub const CONFIG_FILE_NAME: &str = ".ddevstan.toml";

/// When analysis is triggered on the LSP path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateOn {
    /// Run on document save.
    #[default]
    Save,
    /// Run after a typing pause.
    Type,
}

/// Minimum severity a finding must have to be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MinSeverity {
    Error,
    #[default]
    Warning,
    Info,
}

impl MinSeverity {
    /// Whether a finding of `severity` clears this reporting threshold.
    /// `Error` admits only errors, `Warning` admits errors and warnings,
    /// `Info` admits everything.
    pub fn admits(self, severity: DiagnosticSeverity) -> bool {
        match self {
            MinSeverity::Error => severity == DiagnosticSeverity::ERROR,
            MinSeverity::Warning => severity <= DiagnosticSeverity::WARNING,
            MinSeverity::Info => true,
        }
    }
}

/// Analysis settings, treated as immutable for the duration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Whether analysis runs at all.
    pub enable: bool,
    /// Trigger mode for the LSP server.
    pub validate_on: ValidateOn,
    /// PHPStan analysis level (0-9), used when no config file is found.
    pub level: u8,
    /// Minimum severity for reported findings.
    pub min_severity: MinSeverity,
    /// Explicit PHPStan configuration file, passed through verbatim.
    pub config_path: Option<String>,
    /// Paths excluded from analysis when no config file is found.
    pub exclude_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: true,
            validate_on: ValidateOn::Save,
            level: 6,
            min_severity: MinSeverity::Warning,
            config_path: None,
            exclude_paths: default_exclude_paths(),
        }
    }
}

fn default_exclude_paths() -> Vec<String> {
    [
        "vendor/",
        "var/",
        "cache/",
        "public/bundles/",
        "node_modules/",
        "tests/fixtures/",
        "migrations/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load the workspace configuration, falling back to defaults when no
    /// `.ddevstan.toml` exists at the root.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let path = workspace_root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load configuration from an explicit TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            source,
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    Io { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config file at {path}: {message}")]
    Parse { path: String, message: String },
}
