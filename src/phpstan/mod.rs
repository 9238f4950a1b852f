//! PHPStan tool adapter: argument-vector construction and output
//! interpretation.
//!
//! Everything specific to PHPStan's command-line contract lives here; the
//! executor and the editor surfaces stay tool-agnostic.

pub mod command;
pub mod interpret;
pub mod report;

pub use command::{CONFIG_FILE_CANDIDATES, build_args, detect_config_file};
pub use interpret::{Interpretation, interpret};
pub use report::{AnalysisReport, FileResult, ToolMessage};

use crate::ddev::ExecError;

/// Tool name as invoked inside the container.
pub const TOOL_NAME: &str = "phpstan";

/// Human-facing name used in messages.
pub const DISPLAY_NAME: &str = "PHPStan";

/// PHPStan reports "findings present" via exit code 1; only other non-zero
/// codes are real failures.
pub const ALLOWED_EXIT_CODES: &[i32] = &[0, 1];

/// Best-effort one-line summary of a failed PHPStan execution, for user-facing
/// messages. The full command, status, and streams stay on the error object
/// for logging.
pub fn summarize_exec_error(err: &ExecError) -> String {
    if err.status == Some(2) {
        // Exit code 2 is PHPStan's "configuration or fatal error"
        return format!("{DISPLAY_NAME} configuration error. Check your configuration file and settings.");
    }
    if err.stderr.contains("No such file or directory") {
        return format!(
            "{DISPLAY_NAME} command not found. Make sure {DISPLAY_NAME} is installed in your DDEV container."
        );
    }
    if err.stderr.contains("Configuration file") {
        let first_line = err.stderr.lines().next().unwrap_or_default();
        return format!("{DISPLAY_NAME} configuration file error: {first_line}");
    }
    if !err.stderr.is_empty() {
        let head = err.stderr.split("\n\n").next().unwrap_or(&err.stderr);
        return format!("{DISPLAY_NAME} error: {}", head.trim());
    }
    let mut message = err.to_string();
    if let Some(position) = message.find("\n\n") {
        message.truncate(position);
    }
    format!("Error running {DISPLAY_NAME}: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_error(status: Option<i32>, stderr: &str) -> ExecError {
        ExecError {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            command: "ddev exec env XDEBUG_MODE=off phpstan analyze src/Foo.php".to_string(),
        }
    }

    #[test]
    fn exit_two_means_configuration_error() {
        let summary = summarize_exec_error(&exec_error(Some(2), "some noise"));
        assert!(summary.contains("configuration error"));
    }

    #[test]
    fn missing_binary_suggests_installation() {
        let summary = summarize_exec_error(&exec_error(
            Some(127),
            "sh: phpstan: No such file or directory",
        ));
        assert!(summary.contains("installed in your DDEV container"));
    }

    #[test]
    fn configuration_file_errors_keep_the_first_line() {
        let summary = summarize_exec_error(&exec_error(
            Some(3),
            "Configuration file /var/www/html/phpstan.neon is invalid\ndetails follow",
        ));
        assert!(summary.contains("Configuration file /var/www/html/phpstan.neon is invalid"));
        assert!(!summary.contains("details follow"));
    }

    #[test]
    fn verbose_stderr_truncates_at_blank_line() {
        let summary = summarize_exec_error(&exec_error(
            Some(3),
            "something broke\n\nlong trace\nmore trace",
        ));
        assert!(summary.contains("something broke"));
        assert!(!summary.contains("long trace"));
    }
}
