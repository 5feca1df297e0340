//! History view DTOs returned by `track_history`.

use serde::{Deserialize, Serialize};

use super::{AmbiguityWarning, Change, CodeElement, ElementKind};

/// Element identity at one version, without the version's full metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub kind: ElementKind,
    pub key: String,
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub commit: String,
}

impl From<&CodeElement> for ElementSnapshot {
    fn from(element: &CodeElement) -> Self {
        Self {
            kind: element.kind,
            key: element.key.clone(),
            name: element.name.clone(),
            file_path: element.file_path.clone(),
            start_line: element.start_line,
            end_line: element.end_line,
            commit: element.version.id.clone(),
        }
    }
}

/// One edge of an element's history, newest first in `HistoryView::entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub commit: String,
    pub short_id: String,
    pub committer: String,
    pub timestamp: i64,
    pub before: ElementSnapshot,
    pub after: ElementSnapshot,
    pub changes: Vec<Change>,
    pub ambiguity: Option<AmbiguityWarning>,
}

/// Where an ancestry line ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTerminal {
    pub element: ElementSnapshot,
    pub short_id: String,
    pub timestamp: i64,
    /// `introduced`, `repository_root` or `unresolvable: <reason>`
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub element: ElementSnapshot,
    pub entries: Vec<HistoryEntry>,
    pub terminals: Vec<HistoryTerminal>,
}
