//! Refactoring-aware blame engine.
//!
//! - `locator`: finds code elements in a file revision
//! - `matcher`: match verdicts between two revisions, tie-break policy
//! - `graph`: the versioned element graph
//! - `builder`: grows the graph backward through parent commits
//! - `lines`: line correspondence across edges
//! - `blame`: line and element blame over the graph
//! - `file`: per-file line ownership and range blame
//! - `control`: cancellation and deadlines
//!
//! `Tracker` ties them together and is the query API. It is `Send + Sync`;
//! share it behind an `Arc` and run queries from any number of threads. The
//! commit cache and history graph are shared by all queries.

pub mod blame;
pub mod builder;
pub mod control;
pub mod file;
pub mod graph;
pub mod lines;
pub mod locator;
pub mod matcher;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::git::{CacheStats, CommitCache, GitRepository, RepositoryBackend};
use crate::models::{
    BlameResponse, BlameResult, CodeElement, ElementSnapshot, HistoryEntry, HistoryTerminal,
    HistoryView, Version,
};
use crate::structure::{BraceModel, StructuralModel};

pub use blame::BlameResolver;
pub use builder::HistoryGraphBuilder;
pub use control::QueryControl;
pub use file::FileTracker;
pub use graph::{HistoryEdge, HistoryGraph, HistoryLink, HistoryNode, Terminal};
pub use locator::ElementLocator;
pub use matcher::{ElementMatcher, MatchVerdict, Matched, TieBreak, TieBreakPolicy};

pub struct Tracker {
    cache: Arc<CommitCache>,
    locator: Arc<ElementLocator>,
    builder: Arc<HistoryGraphBuilder>,
    resolver: BlameResolver,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(
        backend: Arc<dyn RepositoryBackend>,
        model: Arc<dyn StructuralModel>,
        config: TrackerConfig,
    ) -> Self {
        let cache = Arc::new(CommitCache::new(backend));
        let locator = Arc::new(ElementLocator::new(cache.clone(), model));
        let graph = Arc::new(HistoryGraph::new());
        let builder = Arc::new(HistoryGraphBuilder::new(
            locator.clone(),
            graph,
            config.tie_break.clone(),
        ));

        Self {
            cache,
            locator,
            resolver: BlameResolver::new(builder.clone()),
            builder,
            config,
        }
    }

    /// Tracker over the git repository at (or above) `path`, using the
    /// built-in brace-language model.
    pub fn open<P: AsRef<Path>>(path: P, config: TrackerConfig) -> Result<Self> {
        let repo = GitRepository::open(path)?;
        info!(path = %repo.path, "Opened repository");
        let model = BraceModel::new(config.model.clone());
        Ok(Self::new(Arc::new(repo), Arc::new(model), config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<HistoryGraph> {
        self.builder.graph()
    }

    /// A control carrying the configured timeout.
    pub fn control(&self) -> QueryControl {
        QueryControl::new(CancellationToken::new(), self.config.query_timeout)
    }

    pub fn resolve_version(&self, rev: &str) -> Result<Arc<Version>> {
        let id = self.cache.resolve_revision(rev)?;
        Ok(self.cache.resolve(&id)?)
    }

    pub fn file(&self, version: &Arc<Version>, path: &str) -> Result<FileTracker<'_>> {
        FileTracker::open(&self.resolver, &self.locator, version.clone(), path)
    }

    pub fn blame_line(
        &self,
        version: &Arc<Version>,
        path: &str,
        line: u32,
        control: &QueryControl,
    ) -> Result<BlameResult> {
        let element = self.locator.find_by_line(version, path, line)?;
        let mut lines = self.resolver.line_mapper();
        self.resolver.blame_line(&element, line, &mut lines, control)
    }

    pub fn blame_range(
        &self,
        version: &Arc<Version>,
        path: &str,
        from: u32,
        to: u32,
        control: &QueryControl,
    ) -> Result<BlameResponse> {
        self.file(version, path)?.blame_range(from, to, control)
    }

    pub fn blame_file(&self, version: &Arc<Version>, path: &str, control: &QueryControl) -> Result<BlameResponse> {
        self.file(version, path)?.blame_all(control)
    }

    pub fn blame_element(
        &self,
        version: &Arc<Version>,
        key: &str,
        path_hint: Option<&str>,
        control: &QueryControl,
    ) -> Result<BlameResult> {
        let element = self.locator.find_by_key(version, key, path_hint)?;
        self.resolver.blame_element(&element, control)
    }

    /// Full backward history of an element, newest edge first. Merges
    /// contribute every parent line, not only the first.
    pub fn track_history(
        &self,
        version: &Arc<Version>,
        key: &str,
        path_hint: Option<&str>,
        include_no_change: bool,
        control: &QueryControl,
    ) -> Result<HistoryView> {
        let element = self.locator.find_by_key(version, key, path_hint)?;
        self.builder.expand_all(&element, control)?;

        let graph = self.builder.graph();
        let mut entries = Vec::new();
        let mut terminals = Vec::new();
        let mut seen_terminals = HashSet::new();

        let mut record_terminal = |element: &CodeElement| -> Result<()> {
            let id = element.id();
            if !seen_terminals.insert(id.clone()) {
                return Ok(());
            }
            if let Some(terminal) = graph.node(&id)?.and_then(|n| n.terminal) {
                terminals.push(HistoryTerminal {
                    element: ElementSnapshot::from(element),
                    short_id: element.version.short_id().to_string(),
                    timestamp: element.version.timestamp,
                    reason: terminal.to_string(),
                });
            }
            Ok(())
        };

        record_terminal(&element)?;
        for link in graph.ancestors_of(&element.id()) {
            let link = link?;
            record_terminal(&link.source)?;
            if !include_no_change && !link.edge.is_meaningful() {
                continue;
            }
            let target = &link.target.version;
            entries.push(HistoryEntry {
                commit: target.id.clone(),
                short_id: target.short_id().to_string(),
                committer: target.committer_name.clone(),
                timestamp: target.timestamp,
                before: ElementSnapshot::from(&link.source),
                after: ElementSnapshot::from(&link.target),
                changes: link.edge.changes.clone(),
                ambiguity: link.edge.ambiguity.clone(),
            });
        }

        Ok(HistoryView {
            element: ElementSnapshot::from(&element),
            entries,
            terminals,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
