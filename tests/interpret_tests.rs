use std::path::Path;

use ddevstan::config::MinSeverity;
use ddevstan::phpstan::{Interpretation, interpret};
use tower_lsp::lsp_types::DiagnosticSeverity;

const ABS: &str = "/abs/workspace/src/Foo.php";
const REL: &str = "src/Foo.php";

fn run(raw: &str, min_severity: MinSeverity) -> Interpretation {
    interpret(raw, Path::new(ABS), REL, min_severity)
}

fn diagnostics(interpretation: Interpretation) -> Vec<tower_lsp::lsp_types::Diagnostic> {
    match interpretation {
        Interpretation::Diagnostics(diagnostics) => diagnostics,
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

#[test]
fn empty_output_clears_without_error() {
    assert_eq!(
        run("", MinSeverity::Warning),
        Interpretation::Diagnostics(Vec::new())
    );
    assert_eq!(
        run("   \n\t\n", MinSeverity::Warning),
        Interpretation::Diagnostics(Vec::new())
    );
}

#[test]
fn report_round_trip_produces_one_error_diagnostic() {
    let raw = r#"{
        "totals": {"errors": 0, "file_errors": 1},
        "files": {
            "src/Foo.php": {
                "errors": 1,
                "messages": [{"message": "Undefined variable $x", "line": 10, "ignorable": true}]
            }
        },
        "errors": []
    }"#;

    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.range.start.line, 9);
    assert_eq!(diagnostic.message, "Undefined variable $x");
    assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(diagnostic.source.as_deref(), Some("phpstan"));
}

#[test]
fn report_keyed_by_absolute_path_matches() {
    let raw = format!(
        r#"{{"totals": {{"errors": 0, "file_errors": 1}},
            "files": {{"{ABS}": {{"errors": 1, "messages": [{{"message": "boom", "line": 3}}]}}}},
            "errors": []}}"#
    );
    let diagnostics = diagnostics(run(&raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range.start.line, 2);
}

#[test]
fn report_keyed_by_container_path_matches_via_suffix() {
    // PHPStan inside the container sees a different absolute root
    let raw = r#"{
        "totals": {"errors": 0, "file_errors": 1},
        "files": {"/var/www/html/src/Foo.php": {"errors": 1, "messages": [{"message": "boom", "line": 3}]}},
        "errors": []
    }"#;
    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn report_key_that_is_a_suffix_of_the_absolute_path_matches() {
    let raw = r#"{
        "totals": {"errors": 0, "file_errors": 1},
        "files": {"workspace/src/Foo.php": {"errors": 1, "messages": [{"message": "boom", "line": 3}]}},
        "errors": []
    }"#;
    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn unrelated_file_keys_yield_no_diagnostics() {
    let raw = r#"{
        "totals": {"errors": 0, "file_errors": 1},
        "files": {"src/Bar.php": {"errors": 1, "messages": [{"message": "boom", "line": 3}]}},
        "errors": []
    }"#;
    assert_eq!(
        run(raw, MinSeverity::Warning),
        Interpretation::Diagnostics(Vec::new())
    );
}

#[test]
fn general_errors_bypass_the_severity_filter() {
    // files serialized as [] is PHP's empty-map form
    let raw = r#"{
        "totals": {"errors": 1, "file_errors": 0},
        "files": [],
        "errors": ["Invalid configuration option level"]
    }"#;
    let diagnostics = diagnostics(run(raw, MinSeverity::Error));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range.start.line, 0);
    assert_eq!(diagnostics[0].message, "Invalid configuration option level");
    assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
}

#[test]
fn general_errors_append_after_file_findings() {
    let raw = r#"{
        "totals": {"errors": 1, "file_errors": 1},
        "files": {"src/Foo.php": {"errors": 1, "messages": [{"message": "boom", "line": 5}]}},
        "errors": ["Bad config"]
    }"#;
    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].range.start.line, 4);
    assert_eq!(diagnostics[1].range.start.line, 0);
}

#[test]
fn error_threshold_admits_error_level_findings() {
    // Every PHPStan finding is error severity, so the strictest threshold
    // still reports it.
    let raw = r#"{
        "totals": {"errors": 0, "file_errors": 1},
        "files": {"src/Foo.php": {"errors": 1, "messages": [{"message": "boom", "line": 2}]}},
        "errors": []
    }"#;
    let diagnostics = diagnostics(run(raw, MinSeverity::Error));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn fatal_error_text_becomes_a_first_line_diagnostic() {
    let raw = "PHP Fatal error: Cannot redeclare foo() in /var/www/html/src/Foo.php on line 12";
    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range.start.line, 0);
    assert!(diagnostics[0].message.contains("Fatal error"));
    assert!(diagnostics[0].message.contains("Cannot redeclare foo()"));
}

#[test]
fn fatal_line_is_extracted_from_surrounding_noise() {
    let raw = "Note: something happened\nParse error: syntax error, unexpected '}' in Foo.php on line 3\ntrailing noise";
    let diagnostics = diagnostics(run(raw, MinSeverity::Warning));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "Parse error: syntax error, unexpected '}' in Foo.php on line 3"
    );
}

#[test]
fn missing_configuration_file_is_a_notification_case() {
    let raw = "Configuration file \"/var/www/html/phpstan.custom.neon\" not found.";
    assert_eq!(run(raw, MinSeverity::Warning), Interpretation::MissingConfig);
}

#[test]
fn arbitrary_text_is_benign_unparsable() {
    let raw = "some progress output that is not json";
    assert_eq!(run(raw, MinSeverity::Warning), Interpretation::Unparsable);
}
