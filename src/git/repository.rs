use git2::{Delta, ErrorCode, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use std::path::Path;
use std::sync::Mutex;

use crate::error::RepositoryError;
use crate::git::backend::{CommitRecord, FileBlob, PathChange, PathStatus, RepositoryBackend};

type Result<T> = std::result::Result<T, RepositoryError>;

/// libgit2-backed repository. `git2::Repository` is not `Sync`, so access is
/// serialized through a mutex.
pub struct GitRepository {
    pub repo: Mutex<Repository>,
    pub path: String,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let repo = Repository::discover(&path)
            .map_err(|_| RepositoryError::RepoNotFound(path_str.clone()))?;

        Ok(Self {
            repo: Mutex::new(repo),
            path: path_str,
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        f(&repo)
    }

    /// Current branch name, if HEAD is on a branch.
    pub fn head_branch(&self) -> Result<Option<String>> {
        self.with_repo(|repo| {
            Ok(repo.head().ok().and_then(|h| {
                if h.is_branch() {
                    h.shorthand().map(|s| s.to_string())
                } else {
                    None
                }
            }))
        })
    }
}

fn find_commit<'r>(repo: &'r Repository, id: &str) -> Result<git2::Commit<'r>> {
    let oid = Oid::from_str(id).map_err(|_| RepositoryError::CommitNotFound(id.to_string()))?;
    repo.find_commit(oid)
        .map_err(|_| RepositoryError::CommitNotFound(id.to_string()))
}

fn tree_entry<'r>(
    repo: &'r Repository,
    id: &str,
    path: &str,
) -> Result<Option<git2::TreeEntry<'r>>> {
    let commit = find_commit(repo, id)?;
    let tree = commit.tree()?;
    match tree.get_path(Path::new(path)) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl RepositoryBackend for GitRepository {
    fn resolve_revision(&self, rev: &str) -> Result<String> {
        self.with_repo(|repo| {
            let commit = repo
                .revparse_single(rev)
                .and_then(|obj| obj.peel_to_commit())
                .map_err(|_| RepositoryError::CommitNotFound(rev.to_string()))?;
            Ok(commit.id().to_string())
        })
    }

    fn get_commit(&self, id: &str) -> Result<CommitRecord> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, id)?;
            let author = commit.author();
            let committer = commit.committer();

            Ok(CommitRecord {
                id: commit.id().to_string(),
                timestamp: commit.time().seconds(),
                committer_name: committer.name().unwrap_or("Unknown").to_string(),
                author_name: author.name().unwrap_or("Unknown").to_string(),
                author_email: author.email().unwrap_or("").to_string(),
                summary: commit.summary().unwrap_or("").trim().to_string(),
                parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
            })
        })
    }

    fn get_blob_id_at(&self, id: &str, path: &str) -> Result<Option<String>> {
        self.with_repo(|repo| {
            Ok(tree_entry(repo, id, path)?
                .filter(|entry| entry.kind() == Some(ObjectType::Blob))
                .map(|entry| entry.id().to_string()))
        })
    }

    fn get_file_content_at(&self, id: &str, path: &str) -> Result<Option<FileBlob>> {
        self.with_repo(|repo| {
            let Some(entry) = tree_entry(repo, id, path)? else {
                return Ok(None);
            };
            if entry.kind() != Some(ObjectType::Blob) {
                return Err(RepositoryError::NotAFile {
                    commit: id.to_string(),
                    path: path.to_string(),
                });
            }

            let blob = repo.find_blob(entry.id())?;
            Ok(Some(FileBlob {
                blob_id: entry.id().to_string(),
                content: String::from_utf8_lossy(blob.content()).into_owned(),
            }))
        })
    }

    fn list_changed_paths(&self, id: &str, parent: Option<&str>) -> Result<Vec<PathChange>> {
        self.with_repo(|repo| {
            let tree = find_commit(repo, id)?.tree()?;
            let parent_tree = match parent {
                Some(p) => Some(find_commit(repo, p)?.tree()?),
                None => None,
            };

            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

            let path_of = |file: git2::DiffFile<'_>| {
                file.path().map(|p| p.to_string_lossy().to_string())
            };

            let mut changes = Vec::new();
            for delta in diff.deltas() {
                let change = match delta.status() {
                    Delta::Added | Delta::Copied | Delta::Untracked => PathChange {
                        status: PathStatus::Added,
                        old_path: None,
                        new_path: path_of(delta.new_file()),
                    },
                    Delta::Deleted => PathChange {
                        status: PathStatus::Deleted,
                        old_path: path_of(delta.old_file()),
                        new_path: None,
                    },
                    Delta::Unmodified | Delta::Ignored => continue,
                    _ => PathChange {
                        status: PathStatus::Modified,
                        old_path: path_of(delta.old_file()),
                        new_path: path_of(delta.new_file()),
                    },
                };
                changes.push(change);
            }

            Ok(changes)
        })
    }

    fn list_files(&self, id: &str) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let tree = find_commit(repo, id)?.tree()?;
            let mut files = Vec::new();

            tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                if entry.kind() == Some(ObjectType::Blob) {
                    if let Some(name) = entry.name() {
                        files.push(format!("{}{}", root, name));
                    }
                }
                TreeWalkResult::Ok
            })?;

            files.sort();
            Ok(files)
        })
    }
}
