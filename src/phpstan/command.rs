//! PHPStan argument-vector construction.

use std::path::Path;

use crate::config::Config;

use super::TOOL_NAME;

/// Conventional PHPStan config files probed at the workspace root, in order.
pub const CONFIG_FILE_CANDIDATES: &[&str] = &[
    "phpstan.neon",
    "phpstan.neon.dist",
    "phpstan.dist.neon",
    "phpstan-baseline.neon",
    ".phpstan.neon",
    "phpstan.xml",
    "phpstan.xml.dist",
];

/// First conventional config file that exists at the workspace root.
/// Existence check only; the content is left for PHPStan to validate.
pub fn detect_config_file(workspace_root: &Path) -> Option<&'static str> {
    CONFIG_FILE_CANDIDATES
        .iter()
        .copied()
        .find(|name| workspace_root.join(name).is_file())
}

/// Build the PHPStan argument vector for one file.
///
/// Configuration resolution, first match wins: an explicit `config_path` is
/// passed through verbatim; otherwise the first detected conventional config
/// file; otherwise the explicit level and exclude flags. The target file is
/// always last. Pure given the config and filesystem state.
pub fn build_args(config: &Config, workspace_root: &Path, relative_file: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        TOOL_NAME.to_string(),
        "analyze".to_string(),
        "--error-format=json".to_string(),
        "--no-progress".to_string(),
    ];

    if let Some(path) = config.config_path.as_deref().filter(|p| !p.is_empty()) {
        args.push("-c".to_string());
        args.push(path.to_string());
    } else if let Some(found) = detect_config_file(workspace_root) {
        log::debug!("auto-detected PHPStan config file: {found}");
        args.push("-c".to_string());
        args.push(found.to_string());
    } else {
        args.push(format!("--level={}", config.level));
        for exclude in &config.exclude_paths {
            args.push(format!("--exclude={exclude}"));
        }
    }

    args.push(relative_file.to_string());
    args
}
