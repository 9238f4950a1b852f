//! Conversion of PHPStan findings into LSP diagnostics.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::phpstan::report::ToolMessage;

/// Source tag attached to every published diagnostic, so editors can filter
/// ddevstan's findings apart from other PHP tooling.
pub const SOURCE: &str = "phpstan";

/// "Rest of line" sentinel; editors clamp it to the actual line length.
const LINE_END: u32 = u32::MAX;

fn full_line_range(line: u32) -> Range {
    // PHPStan does not report column ranges, so every diagnostic spans the
    // whole line.
    Range {
        start: Position { line, character: 0 },
        end: Position {
            line,
            character: LINE_END,
        },
    }
}

fn base_diagnostic(line: u32, message: &str) -> Diagnostic {
    Diagnostic {
        range: full_line_range(line),
        // PHPStan's output carries no severity gradient; every finding is an
        // error.
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(SOURCE.to_string()),
        message: message.to_string(),
        ..Default::default()
    }
}

/// Convert one PHPStan message into a diagnostic.
///
/// PHPStan lines are 1-based (and absent for file-scope errors); LSP lines
/// are 0-based. Out-of-range input clamps to line 0 rather than being
/// rejected.
pub fn message_to_diagnostic(message: &ToolMessage) -> Diagnostic {
    let line = message.line.unwrap_or(0).saturating_sub(1);
    base_diagnostic(line, &message.message)
}

/// Diagnostic for a report-level error (usually configuration trouble) that
/// carries no position of its own; pinned to the first line.
pub fn general_error_diagnostic(message: &str) -> Diagnostic {
    base_diagnostic(0, message)
}
