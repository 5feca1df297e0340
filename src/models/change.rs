//! Change annotations carried on history edges.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    NoChange,
    BodyChange,
    SignatureChange,
    Rename,
    Move,
    ExtractMethod,
    InlineMethod,
    Introduced,
    Removed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::NoChange => "no change",
            ChangeType::BodyChange => "body change",
            ChangeType::SignatureChange => "signature change",
            ChangeType::Rename => "rename",
            ChangeType::Move => "move",
            ChangeType::ExtractMethod => "extract method",
            ChangeType::InlineMethod => "inline method",
            ChangeType::Introduced => "introduced",
            ChangeType::Removed => "removed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub change_type: ChangeType,
    pub description: String,
}

impl Change {
    pub fn new(change_type: ChangeType, description: impl Into<String>) -> Self {
        Self {
            change_type,
            description: description.into(),
        }
    }

    pub fn no_change() -> Self {
        Self::new(ChangeType::NoChange, "unchanged")
    }
}

/// True when a change list carries anything besides `NoChange`.
pub fn is_meaningful(changes: &[Change]) -> bool {
    changes.iter().any(|c| c.change_type != ChangeType::NoChange)
}

/// A change list is well formed when it is non-empty and `NoChange` only
/// ever appears alone.
pub fn is_well_formed(changes: &[Change]) -> bool {
    match changes {
        [] => false,
        [_] => true,
        many => many.iter().all(|c| c.change_type != ChangeType::NoChange),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_change_must_stand_alone() {
        assert!(!is_well_formed(&[]));
        assert!(is_well_formed(&[Change::no_change()]));
        assert!(!is_well_formed(&[
            Change::no_change(),
            Change::new(ChangeType::Rename, "foo -> bar")
        ]));
        assert!(is_well_formed(&[
            Change::new(ChangeType::Rename, "foo -> bar"),
            Change::new(ChangeType::BodyChange, "body")
        ]));
    }

    #[test]
    fn meaningful_ignores_no_change() {
        assert!(!is_meaningful(&[Change::no_change()]));
        assert!(is_meaningful(&[Change::new(ChangeType::Move, "A -> B")]));
    }
}
