//! Commit cache shared by all blame queries.
//!
//! Memoizes repository lookups keyed by commit id:
//! - Versions: commit metadata, one `Arc<Version>` per commit
//! - Blobs: `(commit, path)` → blob id, used by the unchanged-file pre-filter
//! - Contents: `(commit, path)` → file text
//! - Tree diffs: `(commit, parent)` → changed paths
//!
//! Git objects are immutable by id, so entries are never invalidated. Two
//! threads racing on the same key both read from the backend and the first
//! insert wins; the loser's value is identical and dropped.
//!
//! Used by: `HistoryGraphBuilder`, `ElementLocator`, `Tracker`

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::error::RepositoryError;
use crate::git::backend::{PathChange, RepositoryBackend};
use crate::models::Version;

type Result<T> = std::result::Result<T, RepositoryError>;
type PathKey = (String, String);

pub struct CommitCache {
    backend: Arc<dyn RepositoryBackend>,
    versions: DashMap<String, Arc<Version>>,
    blobs: DashMap<PathKey, Option<String>>,
    contents: DashMap<PathKey, Option<Arc<str>>>,
    changes: DashMap<PathKey, Arc<Vec<PathChange>>>,
    files: DashMap<String, Arc<Vec<String>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    created_at: Instant,
}

impl CommitCache {
    pub fn new(backend: Arc<dyn RepositoryBackend>) -> Self {
        Self {
            backend,
            versions: DashMap::new(),
            blobs: DashMap::new(),
            contents: DashMap::new(),
            changes: DashMap::new(),
            files: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    /// Revision expressions can move (`HEAD`, branches), so they are never cached.
    pub fn resolve_revision(&self, rev: &str) -> Result<String> {
        self.backend.resolve_revision(rev)
    }

    pub fn resolve(&self, commit_id: &str) -> Result<Arc<Version>> {
        if let Some(version) = self.versions.get(commit_id) {
            self.hit();
            return Ok(version.clone());
        }
        self.miss();

        let record = self.backend.get_commit(commit_id)?;
        let version = Arc::new(Version {
            id: record.id,
            timestamp: record.timestamp,
            committer_name: record.committer_name,
            author_name: record.author_name,
            author_email: record.author_email,
            summary: record.summary,
            parent_ids: record.parent_ids,
        });

        Ok(self
            .versions
            .entry(commit_id.to_string())
            .or_insert(version)
            .clone())
    }

    pub fn parents(&self, commit_id: &str) -> Result<Vec<String>> {
        Ok(self.resolve(commit_id)?.parent_ids.clone())
    }

    pub fn blob_id(&self, commit_id: &str, path: &str) -> Result<Option<String>> {
        let key = (commit_id.to_string(), path.to_string());
        if let Some(blob) = self.blobs.get(&key) {
            self.hit();
            return Ok(blob.clone());
        }
        self.miss();

        let blob = self.backend.get_blob_id_at(commit_id, path)?;
        Ok(self.blobs.entry(key).or_insert(blob).clone())
    }

    /// File text at a commit, `None` if the path does not exist there.
    pub fn file_content(&self, commit_id: &str, path: &str) -> Result<Option<Arc<str>>> {
        let key = (commit_id.to_string(), path.to_string());
        if let Some(content) = self.contents.get(&key) {
            self.hit();
            return Ok(content.clone());
        }
        self.miss();

        let blob = self.backend.get_file_content_at(commit_id, path)?;
        if let Some(ref blob) = blob {
            self.blobs
                .entry(key.clone())
                .or_insert_with(|| Some(blob.blob_id.clone()));
        }
        let content = blob.map(|b| Arc::<str>::from(b.content));
        Ok(self.contents.entry(key).or_insert(content).clone())
    }

    pub fn changed_paths(&self, commit_id: &str, parent_id: &str) -> Result<Arc<Vec<PathChange>>> {
        let key = (commit_id.to_string(), parent_id.to_string());
        if let Some(changes) = self.changes.get(&key) {
            self.hit();
            return Ok(changes.clone());
        }
        self.miss();

        let changes = Arc::new(self.backend.list_changed_paths(commit_id, Some(parent_id))?);
        Ok(self.changes.entry(key).or_insert(changes).clone())
    }

    pub fn files(&self, commit_id: &str) -> Result<Arc<Vec<String>>> {
        if let Some(files) = self.files.get(commit_id) {
            self.hit();
            return Ok(files.clone());
        }
        self.miss();

        let files = Arc::new(self.backend.list_files(commit_id)?);
        Ok(self
            .files
            .entry(commit_id.to_string())
            .or_insert(files)
            .clone())
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get cache statistics for debugging
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_commits: self.versions.len(),
            cached_contents: self.contents.len(),
            cached_diffs: self.changes.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            age_secs: self.created_at.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cached_commits: usize,
    pub cached_contents: usize,
    pub cached_diffs: usize,
    pub hits: u64,
    pub misses: u64,
    pub age_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::backend::{CommitRecord, FileBlob};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Backend over a fixed set of commits that counts every call.
    #[derive(Default)]
    struct CountingBackend {
        files: HashMap<(String, String), String>,
        calls: Mutex<Vec<String>>,
    }

    impl CountingBackend {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RepositoryBackend for CountingBackend {
        fn resolve_revision(&self, rev: &str) -> Result<String> {
            self.record(format!("rev {}", rev));
            Ok("c2".to_string())
        }

        fn get_commit(&self, id: &str) -> Result<CommitRecord> {
            self.record(format!("commit {}", id));
            match id {
                "c1" | "c2" => Ok(CommitRecord {
                    id: id.to_string(),
                    timestamp: if id == "c1" { 100 } else { 200 },
                    committer_name: "Test".to_string(),
                    author_name: "Test".to_string(),
                    author_email: "test@example.com".to_string(),
                    summary: String::new(),
                    parent_ids: if id == "c2" { vec!["c1".to_string()] } else { vec![] },
                }),
                _ => Err(RepositoryError::CommitNotFound(id.to_string())),
            }
        }

        fn get_blob_id_at(&self, id: &str, path: &str) -> Result<Option<String>> {
            self.record(format!("blob {} {}", id, path));
            Ok(self
                .files
                .get(&(id.to_string(), path.to_string()))
                .map(|c| format!("blob-{}", c.len())))
        }

        fn get_file_content_at(&self, id: &str, path: &str) -> Result<Option<FileBlob>> {
            self.record(format!("content {} {}", id, path));
            Ok(self
                .files
                .get(&(id.to_string(), path.to_string()))
                .map(|c| FileBlob {
                    blob_id: format!("blob-{}", c.len()),
                    content: c.clone(),
                }))
        }

        fn list_changed_paths(&self, id: &str, _parent: Option<&str>) -> Result<Vec<PathChange>> {
            self.record(format!("diff {}", id));
            Ok(Vec::new())
        }

        fn list_files(&self, id: &str) -> Result<Vec<String>> {
            self.record(format!("files {}", id));
            Ok(vec!["A.java".to_string()])
        }
    }

    fn backend() -> Arc<CountingBackend> {
        let mut files = HashMap::new();
        files.insert(("c1".to_string(), "A.java".to_string()), "class A {}".to_string());
        Arc::new(CountingBackend {
            files,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn resolve_is_memoized() {
        let backend = backend();
        let cache = CommitCache::new(backend.clone());

        let first = cache.resolve("c2").unwrap();
        let second = cache.resolve("c2").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.parent_ids, vec!["c1".to_string()]);
        assert_eq!(backend.calls(), vec!["commit c2".to_string()]);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn content_lookup_also_fills_blob_ids() {
        let backend = backend();
        let cache = CommitCache::new(backend.clone());

        let content = cache.file_content("c1", "A.java").unwrap().unwrap();
        assert_eq!(&*content, "class A {}");
        assert_eq!(cache.blob_id("c1", "A.java").unwrap().as_deref(), Some("blob-10"));
        assert_eq!(backend.calls(), vec!["content c1 A.java".to_string()]);
    }

    #[test]
    fn missing_paths_are_cached_as_absent() {
        let backend = backend();
        let cache = CommitCache::new(backend.clone());

        assert!(cache.file_content("c2", "A.java").unwrap().is_none());
        assert!(cache.file_content("c2", "A.java").unwrap().is_none());
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn repository_errors_propagate_and_are_not_cached() {
        let backend = backend();
        let cache = CommitCache::new(backend.clone());

        assert!(matches!(
            cache.resolve("nope"),
            Err(RepositoryError::CommitNotFound(_))
        ));
        assert!(cache.resolve("nope").is_err());
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(cache.stats().cached_commits, 0);
    }

    #[test]
    fn concurrent_resolution_yields_one_entry() {
        let backend = backend();
        let cache = Arc::new(CommitCache::new(backend));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.resolve("c1").unwrap())
            })
            .collect();
        let versions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(versions.iter().all(|v| **v == *versions[0]));
        assert_eq!(cache.stats().cached_commits, 1);
    }
}
