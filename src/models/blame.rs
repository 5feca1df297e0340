//! Blame data transfer objects.
//!
//! Plain data suitable for any presentation layer: commit identity, the file
//! path and element identity at the blamed commit, and the line number there.

use serde::{Deserialize, Serialize};

use super::{ChangeType, ElementKind};

/// Why the walk stopped where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlameReason {
    /// The line (or element) was substantively changed by this commit
    Changed,
    /// The element has no counterpart in any parent of this commit
    Introduced,
    /// The walk reached a commit without parents
    RepositoryRoot,
    /// The method was extracted from another method in this commit
    Extracted,
    /// The structural model could not follow the element further back
    Unresolvable,
}

/// Recorded whenever a tie-break chose between equally plausible counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmbiguityWarning {
    /// Commit whose parent held the candidates
    pub commit: String,
    pub element_key: String,
    pub chosen: String,
    pub discarded: Vec<String>,
    pub policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameResult {
    pub commit: String,
    pub short_id: String,
    pub author: String,
    pub committer: String,
    pub timestamp: i64,
    pub date: String,
    /// Path of the file at the blamed commit (may differ from the query path)
    pub file_path: String,
    pub element_kind: ElementKind,
    pub element_key: String,
    pub element_name: String,
    /// Line number at the blamed commit (1-indexed)
    pub line_number: u32,
    /// Line number the query asked about, if it was a line query
    pub query_line: Option<u32>,
    pub reason: BlameReason,
    /// Change types of the edges the walk stopped at
    pub changes: Vec<ChangeType>,
    pub warnings: Vec<AmbiguityWarning>,
}

/// Response for range and whole-file blame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameResponse {
    /// Path of the file at the queried commit
    pub path: String,
    /// Commit OID the blame was calculated from
    pub commit: String,
    /// One entry per physical line, in line order
    pub lines: Vec<BlameResult>,
}
