//! Line correspondence across history edges.
//!
//! Classes are mapped over the whole file (they own every line no member
//! claims); everything else over its own extent. Maps are memoized per edge
//! for the lifetime of one query.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BlameError, Result};
use crate::models::{CodeElement, ElementId, ElementKind};
use crate::structure::LineRange;
use crate::tracker::graph::HistoryLink;
use crate::tracker::locator::ElementLocator;

pub struct LineMapper {
    locator: Arc<ElementLocator>,
    memo: HashMap<(ElementId, ElementId), Arc<Vec<Option<u32>>>>,
}

impl LineMapper {
    pub fn new(locator: Arc<ElementLocator>) -> Self {
        Self {
            locator,
            memo: HashMap::new(),
        }
    }

    /// Line of `link.source` that `line` of `link.target` came from.
    pub fn map(&mut self, link: &HistoryLink, line: u32) -> Result<Option<u32>> {
        let (source, target) = (&link.source, &link.target);
        let map = self.map_for(source, target)?;
        let range = range_of(target, &self.content(target)?);

        let mapped = line
            .checked_sub(range.start)
            .and_then(|offset| map.get(offset as usize).copied().flatten());
        if mapped.is_some() {
            return Ok(mapped);
        }

        // A pure no-op edge still carries the element over unchanged, so a
        // line the text diff could not pair keeps its relative position.
        if !link.edge.is_meaningful() && target.kind != ElementKind::Class {
            let offset = line.saturating_sub(target.start_line);
            let carried = source.start_line + offset;
            if target.contains_line(line) && carried <= source.end_line {
                return Ok(Some(carried));
            }
        }
        Ok(None)
    }

    fn map_for(&mut self, source: &CodeElement, target: &CodeElement) -> Result<Arc<Vec<Option<u32>>>> {
        let key = (source.id(), target.id());
        if let Some(map) = self.memo.get(&key) {
            return Ok(map.clone());
        }

        let old = self.content(source)?;
        let new = self.content(target)?;
        let map = Arc::new(self.locator.model().line_correspondence(
            &old,
            range_of(source, &old),
            &new,
            range_of(target, &new),
        ));
        self.memo.insert(key, map.clone());
        Ok(map)
    }

    fn content(&self, element: &CodeElement) -> Result<Arc<str>> {
        self.locator
            .cache()
            .file_content(&element.version.id, &element.file_path)?
            .ok_or_else(|| {
                BlameError::Internal(format!(
                    "{} missing at {}",
                    element.file_path,
                    element.version.short_id()
                ))
            })
    }
}

fn range_of(element: &CodeElement, content: &str) -> LineRange {
    match element.kind {
        ElementKind::Class => LineRange::whole(content),
        _ => LineRange::new(element.start_line, element.end_line),
    }
}
