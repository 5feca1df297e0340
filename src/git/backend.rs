//! Narrow read-only interface to the repository.
//!
//! The history walk only ever needs commit metadata, file contents at a
//! commit, tree diffs between a commit and one of its parents, and the file
//! list of a commit. `GitRepository` implements this over libgit2; tests and
//! alternative hosts can supply their own.

use crate::error::RepositoryError;

/// Commit metadata as read from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub timestamp: i64,
    pub committer_name: String,
    pub author_name: String,
    pub author_email: String,
    pub summary: String,
    pub parent_ids: Vec<String>,
}

/// A file's blob at some commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub blob_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Added,
    Deleted,
    Modified,
}

/// One entry of a parent→commit tree diff. `old_path` is `None` for added
/// files and `new_path` is `None` for deleted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    pub status: PathStatus,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

pub trait RepositoryBackend: Send + Sync {
    /// Resolve a revision expression (`HEAD`, a branch, a short id) to a
    /// full commit id.
    fn resolve_revision(&self, rev: &str) -> Result<String, RepositoryError>;

    fn get_commit(&self, id: &str) -> Result<CommitRecord, RepositoryError>;

    fn get_parents(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self.get_commit(id)?.parent_ids)
    }

    /// Blob id of `path` at `id`, without reading the content.
    fn get_blob_id_at(&self, id: &str, path: &str) -> Result<Option<String>, RepositoryError>;

    fn get_file_content_at(&self, id: &str, path: &str)
    -> Result<Option<FileBlob>, RepositoryError>;

    /// Paths that differ between `parent` (or the empty tree) and `id`.
    fn list_changed_paths(
        &self,
        id: &str,
        parent: Option<&str>,
    ) -> Result<Vec<PathChange>, RepositoryError>;

    /// Every file path in the tree of `id`.
    fn list_files(&self, id: &str) -> Result<Vec<String>, RepositoryError>;
}
