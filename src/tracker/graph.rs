//! History graph: versioned code elements joined by change-annotated edges.
//!
//! Edges point from the older element to the newer one. The graph only
//! grows: nodes and edges are never removed, and inserting an edge that
//! already exists is a no-op. Concurrent walks that reach the same element
//! therefore cannot corrupt it, they just repeat each other's inserts.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::warn;

use crate::error::{BlameError, MatcherError, Result};
use crate::models::{
    AmbiguityWarning, Change, ChangeType, CodeElement, ElementId, is_meaningful, is_well_formed,
};

/// Why a node has no incoming edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Introduced,
    RepositoryRoot,
    Unresolvable { reason: String },
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminal::Introduced => f.write_str("introduced"),
            Terminal::RepositoryRoot => f.write_str("repository_root"),
            Terminal::Unresolvable { reason } => write!(f, "unresolvable: {}", reason),
        }
    }
}

/// A parent commit the element could not be followed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedParent {
    pub parent: String,
    pub error: MatcherError,
}

#[derive(Debug, Clone)]
pub struct HistoryNode {
    pub element: CodeElement,
    pub terminal: Option<Terminal>,
    /// Every parent of the element's version has been examined
    pub expanded: bool,
    pub unresolved: Vec<UnresolvedParent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEdge {
    pub changes: Vec<Change>,
    pub ambiguity: Option<AmbiguityWarning>,
}

impl HistoryEdge {
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            changes,
            ambiguity: None,
        }
    }

    pub fn no_change() -> Self {
        Self::new(vec![Change::no_change()])
    }

    pub fn is_meaningful(&self) -> bool {
        is_meaningful(&self.changes)
    }

    pub fn has(&self, change_type: ChangeType) -> bool {
        self.changes.iter().any(|c| c.change_type == change_type)
    }

    /// Edge from an inlined method into the method that absorbed it.
    pub fn is_inline_only(&self) -> bool {
        !self.changes.is_empty()
            && self
                .changes
                .iter()
                .all(|c| c.change_type == ChangeType::InlineMethod)
    }
}

/// An edge with both endpoints resolved.
#[derive(Debug, Clone)]
pub struct HistoryLink {
    pub source: CodeElement,
    pub target: CodeElement,
    pub edge: HistoryEdge,
}

#[derive(Default)]
struct Inner {
    graph: DiGraph<HistoryNode, HistoryEdge>,
    index: HashMap<ElementId, NodeIndex>,
}

impl Inner {
    fn node_of(&self, id: &ElementId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    fn link(&self, edge: EdgeIndex) -> Option<HistoryLink> {
        let (source, target) = self.graph.edge_endpoints(edge)?;
        Some(HistoryLink {
            source: self.graph[source].element.clone(),
            target: self.graph[target].element.clone(),
            edge: self.graph[edge].clone(),
        })
    }

    /// Incoming edges of `node`: ordinary edges in the order of the target's
    /// parent list, inline edges last, then by source key.
    fn incoming(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        let target = &self.graph[node].element;
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| e.id())
            .collect();

        edges.sort_by_cached_key(|e| {
            let edge = &self.graph[*e];
            let source = self
                .graph
                .edge_endpoints(*e)
                .map(|(s, _)| &self.graph[s].element);
            let parent = source
                .and_then(|s| target.version.parent_index(&s.version.id))
                .unwrap_or(usize::MAX);
            let key = source.map(|s| (s.key.clone(), s.file_path.clone()));
            (edge.is_inline_only(), parent, key)
        });
        edges
    }
}

#[derive(Default)]
pub struct HistoryGraph {
    inner: RwLock<Inner>,
}

impl HistoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| BlameError::Internal("history graph lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| BlameError::Internal("history graph lock poisoned".to_string()))
    }

    /// Insert `element` unless a node with its identity already exists.
    pub fn add_node(&self, element: &CodeElement) -> Result<ElementId> {
        let id = element.id();
        let mut inner = self.write()?;
        ensure_node(&mut inner, element);
        Ok(id)
    }

    /// Insert `source -> target`. Returns `false` when the edge already
    /// existed; a differing duplicate keeps the first edge.
    pub fn add_edge(
        &self,
        source: &CodeElement,
        target: &CodeElement,
        edge: HistoryEdge,
    ) -> Result<bool> {
        if !is_well_formed(&edge.changes) {
            return Err(BlameError::Internal(format!(
                "malformed change list on {} -> {}",
                source.id(),
                target.id()
            )));
        }

        let mut inner = self.write()?;
        let from = ensure_node(&mut inner, source);
        let to = ensure_node(&mut inner, target);

        if let Some(existing) = inner.graph.find_edge(from, to) {
            if inner.graph[existing] != edge {
                warn!(
                    source = %source.id(),
                    target = %target.id(),
                    "Conflicting edge insert ignored"
                );
            }
            return Ok(false);
        }

        inner.graph.add_edge(from, to, edge);
        Ok(true)
    }

    /// Record why `id` has no incoming edges. The first reason sticks.
    pub fn mark_terminal(&self, id: &ElementId, terminal: Terminal) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(node) = inner.node_of(id) {
            let node = &mut inner.graph[node];
            if node.terminal.is_none() {
                node.terminal = Some(terminal);
            }
        }
        Ok(())
    }

    pub fn mark_expanded(&self, id: &ElementId, unresolved: Vec<UnresolvedParent>) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(node) = inner.node_of(id) {
            let node = &mut inner.graph[node];
            if !node.expanded {
                node.expanded = true;
                node.unresolved = unresolved;
            }
        }
        Ok(())
    }

    pub fn is_expanded(&self, id: &ElementId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .node_of(id)
            .is_some_and(|n| inner.graph[n].expanded))
    }

    pub fn node(&self, id: &ElementId) -> Result<Option<HistoryNode>> {
        let inner = self.read()?;
        Ok(inner.node_of(id).map(|n| inner.graph[n].clone()))
    }

    pub fn contains(&self, id: &ElementId) -> Result<bool> {
        Ok(self.read()?.node_of(id).is_some())
    }

    pub fn incoming(&self, id: &ElementId) -> Result<Vec<HistoryLink>> {
        let inner = self.read()?;
        let Some(node) = inner.node_of(id) else {
            return Ok(Vec::new());
        };
        Ok(inner
            .incoming(node)
            .into_iter()
            .filter_map(|e| inner.link(e))
            .collect())
    }

    /// Every edge reachable backward from `id`, newest source version first.
    /// Reads the graph one step at a time, so edges added by a concurrent
    /// walk while iterating are picked up.
    pub fn ancestors_of(&self, id: &ElementId) -> Ancestors<'_> {
        let mut ancestors = Ancestors {
            graph: self,
            frontier: BinaryHeap::new(),
            visited: HashSet::new(),
            failed: false,
        };
        ancestors.visit(id);
        ancestors
    }

    /// The chain followed by default: from `id`, repeatedly the first
    /// incoming edge, down to a terminal. Pure `NoChange` edges are dropped.
    pub fn meaningful_chain(&self, id: &ElementId) -> Result<Vec<HistoryLink>> {
        Ok(self
            .chain(id)?
            .into_iter()
            .filter(|l| l.edge.is_meaningful())
            .collect())
    }

    /// Like `meaningful_chain`, with `NoChange` edges kept.
    pub fn chain(&self, id: &ElementId) -> Result<Vec<HistoryLink>> {
        let inner = self.read()?;
        let mut chain = Vec::new();
        let mut current = inner.node_of(id);
        let mut seen = HashSet::new();

        while let Some(node) = current {
            if !seen.insert(node) {
                break;
            }
            let first = inner.incoming(node).into_iter().next();
            current = first.and_then(|e| inner.graph.edge_endpoints(e).map(|(s, _)| s));
            if let Some(link) = first.and_then(|e| inner.link(e)) {
                chain.push(link);
            }
        }
        Ok(chain)
    }

    /// Every edge reachable forward from `id` in the materialized graph,
    /// breadth first.
    pub fn descendants_of(&self, id: &ElementId) -> Result<Vec<HistoryLink>> {
        let inner = self.read()?;
        let Some(start) = inner.node_of(id) else {
            return Ok(Vec::new());
        };

        let mut links = Vec::new();
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);
        while let Some(node) = queue.pop_front() {
            let mut edges: Vec<_> = inner
                .graph
                .edges_directed(node, Direction::Outgoing)
                .map(|e| (e.id(), e.target()))
                .collect();
            edges.sort_by(|a, b| inner.graph[a.1].element.id().cmp(&inner.graph[b.1].element.id()));
            for (edge, next) in edges {
                if let Some(link) = inner.link(edge) {
                    links.push(link);
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(links)
    }

    pub fn node_count(&self) -> Result<usize> {
        Ok(self.read()?.graph.node_count())
    }

    pub fn edge_count(&self) -> Result<usize> {
        Ok(self.read()?.graph.edge_count())
    }

    /// Structural invariants: well-formed change lists, parent-to-child
    /// edges only, no cycles, terminals without incoming edges.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let inner = self.inner.read().map_err(|_| "lock poisoned".to_string())?;
        let graph = &inner.graph;

        for edge in graph.edge_references() {
            let source = &graph[edge.source()].element;
            let target = &graph[edge.target()].element;
            if !is_well_formed(&edge.weight().changes) {
                return Err(format!("malformed changes on {} -> {}", source.id(), target.id()));
            }
            if target.version.parent_index(&source.version.id).is_none() {
                return Err(format!(
                    "{} -> {} does not join a commit to its parent",
                    source.id(),
                    target.id()
                ));
            }
        }

        for node in graph.node_indices() {
            if graph[node].terminal.is_some()
                && graph.edges_directed(node, Direction::Incoming).next().is_some()
            {
                return Err(format!("terminal {} has incoming edges", graph[node].element.id()));
            }
        }

        if petgraph::algo::is_cyclic_directed(graph) {
            return Err("history graph has a cycle".to_string());
        }
        Ok(())
    }
}

fn ensure_node(inner: &mut Inner, element: &CodeElement) -> NodeIndex {
    let id = element.id();
    if let Some(node) = inner.node_of(&id) {
        return node;
    }
    let node = inner.graph.add_node(HistoryNode {
        element: element.clone(),
        terminal: None,
        expanded: false,
        unresolved: Vec::new(),
    });
    inner.index.insert(id, node);
    node
}

/// Heap entry ordered newest source first, then by identity.
#[derive(PartialEq, Eq)]
struct Pending {
    timestamp: i64,
    source: Reverse<ElementId>,
    edge: EdgeIndex,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, &self.source, self.edge).cmp(&(other.timestamp, &other.source, other.edge))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lazy backward traversal returned by `HistoryGraph::ancestors_of`.
pub struct Ancestors<'g> {
    graph: &'g HistoryGraph,
    frontier: BinaryHeap<Pending>,
    visited: HashSet<ElementId>,
    failed: bool,
}

impl Ancestors<'_> {
    fn visit(&mut self, id: &ElementId) {
        if !self.visited.insert(id.clone()) {
            return;
        }
        let graph = self.graph;
        let Ok(inner) = graph.read() else {
            self.failed = true;
            return;
        };
        let Some(node) = inner.node_of(id) else {
            return;
        };
        for edge in inner.graph.edges_directed(node, Direction::Incoming) {
            let source = &inner.graph[edge.source()].element;
            self.frontier.push(Pending {
                timestamp: source.version.timestamp,
                source: Reverse(source.id()),
                edge: edge.id(),
            });
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = Result<HistoryLink>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            self.failed = false;
            self.frontier.clear();
            return Some(Err(BlameError::Internal(
                "history graph lock poisoned".to_string(),
            )));
        }
        let pending = self.frontier.pop()?;
        let link = match self.graph.read() {
            Ok(inner) => inner.link(pending.edge),
            Err(e) => {
                self.frontier.clear();
                return Some(Err(e));
            }
        }?;
        self.visit(&pending.source.0);
        Some(Ok(link))
    }
}
