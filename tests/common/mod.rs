//! Test repositories built commit by commit with git2.
//!
//! Every commit is a full snapshot of the listed files, with an explicit
//! timestamp and explicit parents, so merge histories are easy to lay out.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use refblame::models::Version;
use refblame::{QueryControl, Tracker, TrackerConfig};

pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
    clock: i64,
}

enum Node {
    File(Oid),
    Dir(BTreeMap<String, Node>),
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    /// Commit a snapshot of `files` on top of `parents` and move `main` to it.
    pub fn commit(&mut self, message: &str, parents: &[Oid], files: &[(&str, &str)]) -> Oid {
        self.commit_as("Alice", message, parents, files)
    }

    pub fn commit_as(
        &mut self,
        author: &str,
        message: &str,
        parents: &[Oid],
        files: &[(&str, &str)],
    ) -> Oid {
        self.clock += 3600;
        let email = format!("{}@example.com", author.to_lowercase());
        let sig = Signature::new(author, &email, &Time::new(self.clock, 0)).unwrap();

        let mut root = BTreeMap::new();
        for (path, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            insert(&mut root, path, blob);
        }
        let tree_id = write_tree(&self.repo, &root);
        let tree = self.repo.find_tree(tree_id).unwrap();

        let parent_commits: Vec<_> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).unwrap())
            .collect();
        let parent_refs: Vec<_> = parent_commits.iter().collect();

        let oid = self
            .repo
            .commit(None, &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        self.repo
            .reference("refs/heads/main", oid, true, message)
            .unwrap();
        self.repo.set_head("refs/heads/main").unwrap();
        oid
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::open(self.dir.path(), TrackerConfig::default()).unwrap()
    }

    /// Whether `ancestor` is `commit` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: &str, commit: Oid) -> bool {
        let ancestor = Oid::from_str(ancestor).unwrap();
        ancestor == commit || self.repo.graph_descendant_of(commit, ancestor).unwrap()
    }
}

fn insert(dir: &mut BTreeMap<String, Node>, path: &str, blob: Oid) {
    match path.split_once('/') {
        Some((head, rest)) => {
            let child = dir
                .entry(head.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            if let Node::Dir(child) = child {
                insert(child, rest, blob);
            }
        }
        None => {
            dir.insert(path.to_string(), Node::File(blob));
        }
    }
}

fn write_tree(repo: &Repository, dir: &BTreeMap<String, Node>) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for (name, node) in dir {
        match node {
            Node::File(blob) => builder.insert(name, *blob, 0o100644).unwrap(),
            Node::Dir(children) => builder
                .insert(name, write_tree(repo, children), 0o040000)
                .unwrap(),
        };
    }
    builder.write().unwrap()
}

pub fn version(tracker: &Tracker, commit: Oid) -> Arc<Version> {
    tracker.resolve_version(&commit.to_string()).unwrap()
}

pub fn control() -> QueryControl {
    QueryControl::unbounded()
}

/// 1-indexed line of `source` whose trimmed text is `text`.
pub fn line_of(source: &str, text: &str) -> u32 {
    source
        .lines()
        .position(|l| l.trim() == text)
        .map(|i| i as u32 + 1)
        .unwrap_or_else(|| panic!("no line '{}'", text))
}
