#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Write an executable shell stub that stands in for the `ddev` binary. The
/// stub receives the wrapper arguments (`exec env XDEBUG_MODE=off ...`)
/// exactly as the real runtime would.
pub fn write_stub_runtime(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ddev");
    let script = format!("#!/bin/sh\n{body}\n");
    fs::write(&path, script).expect("failed to write stub runtime");
    let mut permissions = fs::metadata(&path).expect("stub metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("failed to mark stub executable");
    path
}

/// Temporary workspace carrying the DDEV project marker.
pub fn workspace_with_marker() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp workspace");
    fs::create_dir_all(dir.path().join(".ddev")).expect("failed to create .ddev");
    fs::write(dir.path().join(".ddev/config.yaml"), "name: test\n")
        .expect("failed to write project marker");
    dir
}

/// Temporary workspace without any DDEV configuration.
pub fn bare_workspace() -> TempDir {
    tempfile::tempdir().expect("failed to create temp workspace")
}
