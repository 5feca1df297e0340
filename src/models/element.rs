//! Code elements tracked through history.
//!
//! A `CodeElement` is one class, method, attribute or local variable as it
//! exists in one `Version`. Graph identity is `(kind, key, version id)`, so the
//! same key in two versions is always two nodes joined by an edge.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Class,
    Method,
    Variable,
    Attribute,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Class => "class",
            ElementKind::Method => "method",
            ElementKind::Variable => "variable",
            ElementKind::Attribute => "attribute",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElement {
    pub kind: ElementKind,
    /// Qualified key, e.g. `pkg.A#foo(int)`
    pub key: String,
    pub name: String,
    /// Key of the enclosing class or method, or the package for top-level types
    pub container: String,
    pub file_path: String,
    /// 1-indexed, inclusive
    pub start_line: u32,
    /// 1-indexed, inclusive
    pub end_line: u32,
    pub version: Arc<Version>,
}

impl CodeElement {
    pub fn id(&self) -> ElementId {
        ElementId {
            kind: self.kind,
            key: self.key.clone(),
            version: self.version.id.clone(),
        }
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Same element re-seated at another version (used when the file is
    /// byte-identical in a parent commit).
    pub fn at_version(&self, version: Arc<Version>) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }
}

/// Node identity in the history graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId {
    pub kind: ElementKind,
    pub key: String,
    pub version: String,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.version[..self.version.len().min(7)];
        write!(f, "{} {}@{}", self.kind, self.key, short)
    }
}
