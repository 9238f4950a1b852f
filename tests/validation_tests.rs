mod common;

use common::{bare_workspace, workspace_with_marker, write_stub_runtime};
use ddevstan::ddev::{DdevClient, ValidationErrorKind, ValidationOutcome};

fn client_with_stub(workspace: &tempfile::TempDir, body: &str) -> DdevClient {
    let stub = write_stub_runtime(workspace.path(), body);
    DdevClient::with_runtime(workspace.path(), stub.to_string_lossy())
}

#[tokio::test]
async fn missing_marker_short_circuits_before_any_probe() {
    let workspace = bare_workspace();
    // The stub records every invocation; the marker check must stop first.
    let sentinel = workspace.path().join("invoked");
    let client = client_with_stub(
        &workspace,
        &format!("touch {}\nexit 0", sentinel.display()),
    );

    let outcome = client.validate_tool("phpstan").await;
    assert_eq!(
        outcome,
        ValidationOutcome::Invalid {
            kind: ValidationErrorKind::NoDdevProject,
            message: "No DDEV project found".to_string(),
        }
    );
    assert!(!sentinel.exists(), "runtime must not be probed without a project");
}

#[tokio::test]
async fn working_tool_probe_validates() {
    let workspace = workspace_with_marker();
    let client = client_with_stub(&workspace, "exit 0");

    let outcome = client.validate_tool("phpstan").await;
    assert!(outcome.is_valid());
}

#[tokio::test]
async fn unreachable_runtime_reports_ddev_not_running() {
    let workspace = workspace_with_marker();
    let client = client_with_stub(&workspace, "exit 1");

    match client.validate_tool("phpstan").await {
        ValidationOutcome::Invalid { kind, message } => {
            assert_eq!(kind, ValidationErrorKind::DdevNotRunning);
            assert!(message.contains("ddev start"));
            assert!(message.contains("phpstan"));
        }
        other => panic!("expected DdevNotRunning, got {other:?}"),
    }
}

#[tokio::test]
async fn reachable_runtime_with_failing_tool_reports_tool_not_found() {
    let workspace = workspace_with_marker();
    // Fail only the version probe; the no-op runtime probe succeeds.
    let client = client_with_stub(
        &workspace,
        r#"case "$*" in *--version*) exit 127 ;; *) exit 0 ;; esac"#,
    );

    match client.validate_tool("phpstan").await {
        ValidationOutcome::Invalid { kind, message } => {
            assert_eq!(kind, ValidationErrorKind::ToolNotFound);
            assert!(message.contains("ddev composer require --dev phpstan/phpstan"));
        }
        other => panic!("expected ToolNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tools_get_a_same_named_package_guess() {
    let workspace = workspace_with_marker();
    let client = client_with_stub(
        &workspace,
        r#"case "$*" in *--version*) exit 127 ;; *) exit 0 ;; esac"#,
    );

    match client.validate_tool("psalm").await {
        ValidationOutcome::Invalid { kind, message } => {
            assert_eq!(kind, ValidationErrorKind::ToolNotFound);
            assert!(message.contains("psalm/psalm"));
        }
        other => panic!("expected ToolNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn validation_is_never_cached_between_calls() {
    let workspace = workspace_with_marker();
    // The stub flips behavior on a state file: the first run fails, later
    // runs succeed, like a container started between calls.
    let state = workspace.path().join("started");
    let client = client_with_stub(
        &workspace,
        &format!(
            "if [ -f {state} ]; then exit 0; else touch {state}; exit 1; fi",
            state = state.display()
        ),
    );

    let first = client.validate_tool("phpstan").await;
    assert!(!first.is_valid());

    let second = client.validate_tool("phpstan").await;
    assert!(second.is_valid(), "a restarted container must be picked up");
}
