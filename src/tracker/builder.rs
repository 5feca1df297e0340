//! History Graph Builder.
//!
//! Expands one `(element, version)` node at a time: every parent commit is
//! examined, counterparts become incoming edges, and a node nothing matched
//! becomes a terminal. Expansion is per node, so callers decide how far back
//! to go: line blame stops at the first edge that changed the line, element
//! history walks everything.
//!
//! Per parent:
//! 1. Same blob at the same path: `NoChange` edge, the matcher is skipped
//! 2. Otherwise the matcher runs on the same path
//! 3. If that finds nothing, files deleted or modified by the commit are
//!    searched (moves across files)

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{BlameError, MatcherError, Result};
use crate::git::{CommitCache, PathStatus};
use crate::models::{AmbiguityWarning, Change, ChangeType, CodeElement, ElementId, Version};
use crate::tracker::control::QueryControl;
use crate::tracker::graph::{HistoryEdge, HistoryGraph, Terminal, UnresolvedParent};
use crate::tracker::locator::ElementLocator;
use crate::tracker::matcher::{ElementMatcher, Matched, TieBreakPolicy};

/// What one parent contributed to a node.
struct ParentMatch {
    source: CodeElement,
    edge: HistoryEdge,
    inlined: Vec<CodeElement>,
}

pub struct HistoryGraphBuilder {
    cache: Arc<CommitCache>,
    locator: Arc<ElementLocator>,
    matcher: ElementMatcher,
    graph: Arc<HistoryGraph>,
    policy: TieBreakPolicy,
}

impl HistoryGraphBuilder {
    pub fn new(locator: Arc<ElementLocator>, graph: Arc<HistoryGraph>, policy: TieBreakPolicy) -> Self {
        Self {
            cache: locator.cache().clone(),
            matcher: ElementMatcher::new(locator.clone()),
            locator,
            graph,
            policy,
        }
    }

    pub fn graph(&self) -> &Arc<HistoryGraph> {
        &self.graph
    }

    pub fn locator(&self) -> &Arc<ElementLocator> {
        &self.locator
    }

    pub fn policy(&self) -> &TieBreakPolicy {
        &self.policy
    }

    /// Make sure every incoming edge of `element` is in the graph. Returns the
    /// sources of those edges. A node that is already expanded is not
    /// examined again.
    pub fn expand_node(&self, element: &CodeElement, control: &QueryControl) -> Result<Vec<CodeElement>> {
        control.check()?;

        let id = self.graph.add_node(element)?;
        if self.graph.is_expanded(&id)? {
            return self.sources(&id);
        }

        let version = &element.version;
        if version.is_root() {
            debug!(element = %id, "Reached repository root");
            self.graph.mark_terminal(&id, Terminal::RepositoryRoot)?;
            self.graph.mark_expanded(&id, Vec::new())?;
            return Ok(Vec::new());
        }

        let mut matched_any = false;
        let mut unresolved = Vec::new();

        for parent_id in &version.parent_ids {
            control.check()?;
            let parent = self
                .cache
                .resolve(parent_id)
                .map_err(|e| BlameError::at(parent_id, &id.to_string(), e))?;

            match self.match_in_parent(element, &parent) {
                Ok(Some(found)) => {
                    debug!(
                        element = %id,
                        parent = %parent.short_id(),
                        source = %found.source.key,
                        "Matched in parent"
                    );
                    self.graph.add_edge(&found.source, element, found.edge)?;
                    for inlined in &found.inlined {
                        let edge = HistoryEdge::new(vec![Change::new(
                            ChangeType::InlineMethod,
                            format!("inlined into {}", element.key),
                        )]);
                        self.graph.add_edge(inlined, element, edge)?;
                    }
                    matched_any = true;
                }
                Ok(None) => {
                    debug!(element = %id, parent = %parent.short_id(), "No counterpart in parent");
                }
                Err(BlameError::Matcher(error)) => {
                    warn!(
                        element = %id,
                        parent = %parent.short_id(),
                        error = %error,
                        "Branch unresolvable"
                    );
                    unresolved.push(UnresolvedParent {
                        parent: parent.id.clone(),
                        error,
                    });
                }
                Err(BlameError::Repository(e)) => {
                    return Err(BlameError::at(&parent.id, &id.to_string(), e));
                }
                Err(e) => return Err(e),
            }
        }

        if !matched_any {
            let terminal = match unresolved.first() {
                Some(u) => Terminal::Unresolvable {
                    reason: u.error.to_string(),
                },
                None => Terminal::Introduced,
            };
            debug!(element = %id, terminal = %terminal, "Terminal node");
            self.graph.mark_terminal(&id, terminal)?;
        }
        self.graph.mark_expanded(&id, unresolved)?;

        self.sources(&id)
    }

    /// Expand every ancestor of `seed`, newest version first.
    pub fn expand_all(&self, seed: &CodeElement, control: &QueryControl) -> Result<()> {
        let mut frontier = BinaryHeap::new();
        let mut visited: HashSet<ElementId> = HashSet::new();
        frontier.push(Frontier::of(seed.clone()));

        while let Some(Frontier { element, .. }) = frontier.pop() {
            if !visited.insert(element.id()) {
                continue;
            }
            for source in self.expand_node(&element, control)? {
                if !visited.contains(&source.id()) {
                    frontier.push(Frontier::of(source));
                }
            }
        }

        info!(
            seed = %seed.id(),
            visited = visited.len(),
            nodes = self.graph.node_count()?,
            edges = self.graph.edge_count()?,
            "History walk complete"
        );
        Ok(())
    }

    fn sources(&self, id: &ElementId) -> Result<Vec<CodeElement>> {
        Ok(self
            .graph
            .incoming(id)?
            .into_iter()
            .map(|link| link.source)
            .collect())
    }

    /// The counterpart of `element` in `parent`, if any.
    fn match_in_parent(&self, element: &CodeElement, parent: &Arc<Version>) -> Result<Option<ParentMatch>> {
        let version = &element.version;
        let path = element.file_path.as_str();

        let blob = self.cache.blob_id(&version.id, path)?;
        let parent_blob = self.cache.blob_id(&parent.id, path)?;
        if blob.is_some() && blob == parent_blob {
            return Ok(Some(ParentMatch {
                source: element.at_version(parent.clone()),
                edge: HistoryEdge::no_change(),
                inlined: Vec::new(),
            }));
        }

        let mut candidates = Vec::new();
        let mut failure: Option<MatcherError> = None;

        if parent_blob.is_some() {
            candidates = self
                .matcher
                .match_element(parent, path, element)?
                .into_candidates();
        }

        if candidates.is_empty() {
            let changed = self.cache.changed_paths(&version.id, &parent.id)?;
            let moved_from = changed.iter().filter_map(|c| match c.status {
                PathStatus::Deleted | PathStatus::Modified => c.old_path.as_deref(),
                PathStatus::Added => None,
            });

            for old_path in moved_from {
                if old_path == path || !self.locator.model().supports(old_path) {
                    continue;
                }
                match self.matcher.match_element(parent, old_path, element) {
                    Ok(verdict) => candidates.extend(verdict.into_candidates()),
                    Err(BlameError::Matcher(e)) => {
                        debug!(path = %old_path, error = %e, "Skipping unparsable candidate file");
                        failure.get_or_insert(e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if candidates.is_empty() {
            return match failure {
                Some(e) => Err(e.into()),
                None => Ok(None),
            };
        }

        Ok(self.choose(element, candidates))
    }

    /// Pick one candidate with the tie-break policy, recording a warning when
    /// a discarded candidate was just as similar.
    fn choose(&self, element: &CodeElement, candidates: Vec<Matched>) -> Option<ParentMatch> {
        let (chosen, discarded) = self.policy.select(candidates)?;

        let ambiguity = discarded
            .iter()
            .any(|d| (d.similarity - chosen.similarity).abs() < 1e-9)
            .then(|| AmbiguityWarning {
                commit: element.version.id.clone(),
                element_key: element.key.clone(),
                chosen: format!("{} ({})", chosen.element.key, chosen.element.file_path),
                discarded: discarded
                    .iter()
                    .map(|d| format!("{} ({})", d.element.key, d.element.file_path))
                    .collect(),
                policy: self.policy.to_string(),
            });

        if let Some(warning) = &ambiguity {
            info!(
                element = %element.id(),
                chosen = %warning.chosen,
                discarded = warning.discarded.len(),
                "Ambiguous match resolved by tie-break"
            );
        }

        Some(ParentMatch {
            source: chosen.element,
            edge: HistoryEdge {
                changes: chosen.changes,
                ambiguity,
            },
            inlined: chosen.inlined,
        })
    }
}

/// Frontier entry: newest version first, then by identity.
#[derive(PartialEq, Eq)]
struct Frontier {
    timestamp: i64,
    id: Reverse<ElementId>,
    element: CodeElement,
}

impl Frontier {
    fn of(element: CodeElement) -> Self {
        Self {
            timestamp: element.version.timestamp,
            id: Reverse(element.id()),
            element,
        }
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.timestamp, &self.id).cmp(&(other.timestamp, &other.id))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
