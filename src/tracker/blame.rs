//! Blame Resolver.
//!
//! Line blame follows one line backward through the history graph, expanding
//! nodes on demand, until no incoming edge carries the line: that version is
//! the one that wrote it. Element blame follows the default chain to the
//! element's terminal.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::{AmbiguityWarning, BlameReason, BlameResult, ChangeType, CodeElement};
use crate::tracker::builder::HistoryGraphBuilder;
use crate::tracker::control::QueryControl;
use crate::tracker::graph::{HistoryLink, Terminal};
use crate::tracker::lines::LineMapper;

pub struct BlameResolver {
    builder: Arc<HistoryGraphBuilder>,
}

impl BlameResolver {
    pub fn new(builder: Arc<HistoryGraphBuilder>) -> Self {
        Self { builder }
    }

    pub fn line_mapper(&self) -> LineMapper {
        LineMapper::new(self.builder.locator().clone())
    }

    /// Blame `line` of `element` (at the element's own version).
    pub fn blame_line(
        &self,
        element: &CodeElement,
        line: u32,
        lines: &mut LineMapper,
        control: &QueryControl,
    ) -> Result<BlameResult> {
        let query_line = line;
        let mut current = element.clone();
        let mut line = line;
        let mut warnings = Vec::new();

        loop {
            let incoming = self.incoming(&current, control)?;

            let mut carried = None;
            for link in &incoming {
                if let Some(mapped) = lines.map(link, line)? {
                    carried = Some((link, mapped));
                    break;
                }
            }

            let Some((link, mapped)) = carried else {
                let reason = match incoming.first() {
                    Some(_) => BlameReason::Changed,
                    None => self.terminal_reason(&current)?,
                };
                // Every parent edge rewrote the line.
                let changes = if incoming.is_empty() {
                    terminal_changes(reason)
                } else {
                    change_types(&incoming)
                };
                debug!(element = %current.id(), line, reason = ?reason, "Line resolved");
                return Ok(result(&current, line, Some(query_line), reason, changes, warnings));
            };

            push_warning(&mut warnings, link.edge.ambiguity.as_ref());
            current = link.source.clone();
            line = mapped;
        }
    }

    /// Blame `element` as a whole: where it was introduced, or extracted
    /// from another method.
    pub fn blame_element(&self, element: &CodeElement, control: &QueryControl) -> Result<BlameResult> {
        let mut current = element.clone();
        let mut warnings = Vec::new();

        loop {
            let incoming = self.incoming(&current, control)?;
            let Some(first) = incoming.first() else {
                let reason = self.terminal_reason(&current)?;
                let changes = terminal_changes(reason);
                return Ok(result(&current, current.start_line, None, reason, changes, warnings));
            };

            if first.edge.has(ChangeType::ExtractMethod) {
                push_warning(&mut warnings, first.edge.ambiguity.as_ref());
                let changes = change_types([first]);
                return Ok(result(
                    &current,
                    current.start_line,
                    None,
                    BlameReason::Extracted,
                    changes,
                    warnings,
                ));
            }

            push_warning(&mut warnings, first.edge.ambiguity.as_ref());
            current = first.source.clone();
        }
    }

    fn incoming(&self, element: &CodeElement, control: &QueryControl) -> Result<Vec<HistoryLink>> {
        self.builder.expand_node(element, control)?;
        self.builder.graph().incoming(&element.id())
    }

    fn terminal_reason(&self, element: &CodeElement) -> Result<BlameReason> {
        let node = self.builder.graph().node(&element.id())?;
        Ok(match node.and_then(|n| n.terminal) {
            Some(Terminal::RepositoryRoot) => BlameReason::RepositoryRoot,
            Some(Terminal::Unresolvable { .. }) => BlameReason::Unresolvable,
            Some(Terminal::Introduced) | None => BlameReason::Introduced,
        })
    }
}

/// Change types across `links`, in edge order, without repeats.
fn change_types<'a>(links: impl IntoIterator<Item = &'a HistoryLink>) -> Vec<ChangeType> {
    let mut types = Vec::new();
    for change in links.into_iter().flat_map(|l| &l.edge.changes) {
        if !types.contains(&change.change_type) {
            types.push(change.change_type);
        }
    }
    types
}

fn terminal_changes(reason: BlameReason) -> Vec<ChangeType> {
    match reason {
        BlameReason::Introduced => vec![ChangeType::Introduced],
        _ => Vec::new(),
    }
}

fn push_warning(warnings: &mut Vec<AmbiguityWarning>, warning: Option<&AmbiguityWarning>) {
    if let Some(w) = warning {
        if !warnings.contains(w) {
            warnings.push(w.clone());
        }
    }
}

fn result(
    element: &CodeElement,
    line: u32,
    query_line: Option<u32>,
    reason: BlameReason,
    changes: Vec<ChangeType>,
    warnings: Vec<AmbiguityWarning>,
) -> BlameResult {
    let version = &element.version;
    BlameResult {
        commit: version.id.clone(),
        short_id: version.short_id().to_string(),
        author: version.author_name.clone(),
        committer: version.committer_name.clone(),
        timestamp: version.timestamp,
        date: version.date(),
        file_path: element.file_path.clone(),
        element_kind: element.kind,
        element_key: element.key.clone(),
        element_name: element.name.clone(),
        line_number: line,
        query_line,
        reason,
        changes,
        warnings,
    }
}
