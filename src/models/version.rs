//! Immutable commit identity used to version code elements.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One commit's identity and metadata. Created once per commit id by the
/// `CommitCache` and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub timestamp: i64,
    pub committer_name: String,
    pub author_name: String,
    pub author_email: String,
    pub summary: String,
    pub parent_ids: Vec<String>,
}

impl Version {
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(7)]
    }

    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Position of `parent` among this commit's parents, if it is one.
    pub fn parent_index(&self, parent: &str) -> Option<usize> {
        self.parent_ids.iter().position(|p| p == parent)
    }

    /// RFC 3339 rendering of the commit timestamp.
    pub fn date(&self) -> String {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|d| d.to_rfc3339())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(id: &str, parents: &[&str]) -> Version {
        Version {
            id: id.to_string(),
            timestamp: 1_700_000_000,
            committer_name: "Test".to_string(),
            author_name: "Test".to_string(),
            author_email: "test@example.com".to_string(),
            summary: "msg".to_string(),
            parent_ids: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn short_id_and_parents() {
        let v = version("0123456789abcdef", &["aaa", "bbb"]);
        assert_eq!(v.short_id(), "0123456");
        assert_eq!(v.parent_index("bbb"), Some(1));
        assert!(!v.is_root());
        assert!(version("abc", &[]).is_root());
        assert_eq!(version("abc", &[]).short_id(), "abc");
    }

    #[test]
    fn date_is_rfc3339() {
        assert_eq!(version("a", &[]).date(), "2023-11-14T22:13:20+00:00");
    }
}
