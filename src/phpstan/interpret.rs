//! Triage of raw PHPStan output into diagnostics.
//!
//! The output is heterogeneous: JSON on success (including partial failure,
//! where the report carries general errors), freeform text when PHP itself
//! dies or the configuration is broken. Everything funnels into a single
//! [`Interpretation`] so callers decide presentation, not parsing.

use std::path::Path;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};

use crate::config::MinSeverity;
use crate::diagnostics;

use super::report::{AnalysisReport, FileResult};

/// Outcome of interpreting one invocation's raw output.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Structured output parsed. The list replaces the document's previous
    /// diagnostics; empty means clear.
    Diagnostics(Vec<Diagnostic>),
    /// Fatal output with no line that could be isolated; surface a
    /// notification instead of a diagnostic.
    Fatal,
    /// The configuration file PHPStan was pointed at does not exist.
    MissingConfig,
    /// Output was not parsable but nothing indicates the run itself failed.
    Unparsable,
}

const FATAL_MARKERS: &[&str] = &["Fatal error", "Parse error", "Syntax error"];

/// Interpret PHPStan's raw output for one document.
///
/// `absolute_path` and `relative_path` are the editor's two representations
/// of the document; the report may key the same file by yet another form.
pub fn interpret(
    raw: &str,
    absolute_path: &Path,
    relative_path: &str,
    min_severity: MinSeverity,
) -> Interpretation {
    let raw = raw.trim();
    // No output on a clean exit means no findings
    if raw.is_empty() {
        return Interpretation::Diagnostics(Vec::new());
    }

    match serde_json::from_str::<AnalysisReport>(raw) {
        Ok(report) => Interpretation::Diagnostics(collect_diagnostics(
            &report,
            absolute_path,
            relative_path,
            min_severity,
        )),
        Err(err) => triage_unstructured(raw, &err),
    }
}

fn collect_diagnostics(
    report: &AnalysisReport,
    absolute_path: &Path,
    relative_path: &str,
    min_severity: MinSeverity,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Some((key, file)) = match_file(report, absolute_path, relative_path) {
        log::debug!(
            "matched report key {key} for {relative_path} ({} messages)",
            file.messages.len()
        );
        for message in &file.messages {
            // PHPStan has no severity gradient; every finding is an error
            let severity = DiagnosticSeverity::ERROR;
            if min_severity.admits(severity) {
                diagnostics.push(diagnostics::message_to_diagnostic(message));
            }
        }
    }

    // General errors are configuration-level problems; they bypass the
    // severity filter so a broken setup is never silently hidden.
    for error in &report.errors {
        diagnostics.push(diagnostics::general_error_diagnostic(error));
    }

    diagnostics
}

/// Find the report entry for the current document.
///
/// PHPStan may key files by container-absolute paths or paths relative to
/// whichever root its own configuration resolved, so equality against either
/// editor form or a path-suffix relation in either direction counts. First
/// matching key wins.
fn match_file<'r>(
    report: &'r AnalysisReport,
    absolute_path: &Path,
    relative_path: &str,
) -> Option<(&'r str, &'r FileResult)> {
    let absolute = absolute_path.to_string_lossy();
    report
        .files
        .iter()
        .find(|(key, _)| {
            let key = key.as_str();
            key == absolute
                || key == relative_path
                || key.ends_with(relative_path)
                || absolute.ends_with(key)
        })
        .map(|(key, file)| (key.as_str(), file))
}

fn triage_unstructured(raw: &str, parse_error: &serde_json::Error) -> Interpretation {
    if FATAL_MARKERS.iter().any(|marker| raw.contains(marker)) {
        let fatal_line = raw
            .lines()
            .find(|line| FATAL_MARKERS.iter().any(|marker| line.contains(marker)));
        return match fatal_line {
            Some(line) => {
                Interpretation::Diagnostics(vec![diagnostics::general_error_diagnostic(
                    line.trim(),
                )])
            }
            None => Interpretation::Fatal,
        };
    }

    if raw.contains("Configuration file") && raw.contains("not found") {
        return Interpretation::MissingConfig;
    }

    log::warn!("failed to parse PHPStan output, the run may still have succeeded: {parse_error}");
    Interpretation::Unparsable
}
