//! Serde model of PHPStan's `--error-format=json` output.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// Aggregate counts at the top of the report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub file_errors: u64,
}

/// One finding inside a file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolMessage {
    /// The error message text.
    pub message: String,
    /// 1-based source line; null for file-scope errors.
    #[serde(default)]
    pub line: Option<u32>,
    /// Whether PHPStan considers the error ignorable.
    #[serde(default)]
    pub ignorable: Option<bool>,
}

/// All findings for one file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileResult {
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub messages: Vec<ToolMessage>,
}

/// The whole analysis report for one invocation.
///
/// `files` keys are paths as PHPStan saw them, which may be container paths
/// or relative to a different root than the editor's; see the interpreter's
/// matching rules.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub totals: Totals,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub files: IndexMap<String, FileResult>,
    /// General errors not tied to a file, typically configuration problems.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// PHPStan builds its JSON in PHP, where an empty associative array encodes
/// as `[]` rather than `{}`.
fn map_or_empty_list<'de, D>(deserializer: D) -> Result<IndexMap<String, FileResult>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(IndexMap<String, FileResult>),
        List(Vec<serde_json::Value>),
    }

    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => map,
        MapOrList::List(_) => IndexMap::new(),
    })
}
