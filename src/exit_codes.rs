/// Exit codes for the ddevstan CLI, mirroring PHPStan's own convention so
/// wrapper scripts and CI systems see familiar semantics.
/// Success - clean analysis, no findings
pub const SUCCESS: i32 = 0;

/// Findings present - PHPStan reported one or more issues
pub const FINDINGS: i32 = 1;

/// Tool error - environment, configuration, or execution failure
pub const TOOL_ERROR: i32 = 2;
