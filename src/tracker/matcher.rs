//! Element Matcher adapter.
//!
//! Translates the structural model's counterparts into match verdicts with
//! change lists. Also owns the tie-break policy used when more than one
//! counterpart is equally plausible.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MatcherError, Result};
use crate::models::{Change, ChangeType, CodeElement, ElementKind, Version};
use crate::structure::{Counterpart, Declaration, Relation};
use crate::tracker::locator::ElementLocator;

/// Similarities closer than this are a tie.
const SIMILARITY_EPSILON: f64 = 1e-9;

/// One counterpart of the tracked element in the older version.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
    pub element: CodeElement,
    pub changes: Vec<Change>,
    /// Vanished old methods inlined into the tracked element
    pub inlined: Vec<CodeElement>,
    pub similarity: f64,
    pub line_delta: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchVerdict {
    Unmatched,
    MatchedUnchanged(Matched),
    MatchedChanged(Matched),
    /// Equally plausible counterparts, best first
    Ambiguous(Vec<Matched>),
}

impl MatchVerdict {
    pub fn into_candidates(self) -> Vec<Matched> {
        match self {
            MatchVerdict::Unmatched => Vec::new(),
            MatchVerdict::MatchedUnchanged(m) | MatchVerdict::MatchedChanged(m) => vec![m],
            MatchVerdict::Ambiguous(all) => all,
        }
    }
}

pub struct ElementMatcher {
    locator: Arc<ElementLocator>,
}

impl ElementMatcher {
    pub fn new(locator: Arc<ElementLocator>) -> Self {
        Self { locator }
    }

    /// Match `element` (at its own version, in `element.file_path`) against
    /// `old_path` at `old_version`.
    pub fn match_element(
        &self,
        old_version: &Arc<Version>,
        old_path: &str,
        element: &CodeElement,
    ) -> Result<MatchVerdict> {
        let Some(new_file) = self.locator.parse(&element.version.id, &element.file_path)? else {
            return Err(self.missing(element).into());
        };
        let target = new_file
            .find(element.kind, &element.key)
            .ok_or_else(|| self.missing(element))?;

        let Some(old_file) = self.locator.parse(&old_version.id, old_path)? else {
            return Ok(MatchVerdict::Unmatched);
        };

        let successor_file = if old_path == element.file_path {
            Some(new_file.clone())
        } else {
            self.locator.parse(&element.version.id, old_path)?
        };
        let successor = successor_file.as_ref().map(|f| f.snapshot());

        let counterparts = self.locator.model().counterparts(
            &old_file.snapshot(),
            &new_file.snapshot(),
            successor.as_ref(),
            target,
        );

        let mut candidates: Vec<Matched> = counterparts
            .into_iter()
            .map(|c| self.translate(c, old_version, old_path, target, element))
            .collect();
        candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        Ok(match candidates.len() {
            0 => MatchVerdict::Unmatched,
            1 => verdict_for(candidates.remove(0)),
            _ => {
                let best = candidates[0].similarity;
                let tied = candidates
                    .iter()
                    .take_while(|c| (best - c.similarity).abs() < SIMILARITY_EPSILON)
                    .count();
                if tied > 1 {
                    candidates.truncate(tied);
                    MatchVerdict::Ambiguous(candidates)
                } else {
                    verdict_for(candidates.remove(0))
                }
            }
        })
    }

    fn missing(&self, element: &CodeElement) -> MatcherError {
        MatcherError::MissingElement {
            key: element.key.clone(),
            commit: element.version.id.clone(),
        }
    }

    fn translate(
        &self,
        counterpart: Counterpart,
        old_version: &Arc<Version>,
        old_path: &str,
        target: &Declaration,
        element: &CodeElement,
    ) -> Matched {
        let old = &counterpart.declaration;
        let changes = match counterpart.relation {
            Relation::ExtractedFrom => vec![Change::new(
                ChangeType::ExtractMethod,
                format!("extracted from {}", old.key),
            )],
            Relation::Correspondent => {
                classify(old, old_path, target, &element.file_path, &counterpart.absorbed)
            }
        };

        Matched {
            element: old.to_element(old_path, old_version.clone()),
            changes,
            inlined: counterpart
                .absorbed
                .iter()
                .map(|d| d.to_element(old_path, old_version.clone()))
                .collect(),
            similarity: counterpart.similarity,
            line_delta: old.start_line.abs_diff(target.start_line),
        }
    }
}

fn verdict_for(matched: Matched) -> MatchVerdict {
    if matched.changes.is_empty() {
        MatchVerdict::MatchedUnchanged(Matched {
            changes: vec![Change::no_change()],
            ..matched
        })
    } else {
        MatchVerdict::MatchedChanged(matched)
    }
}

/// Changes turning `old` into `new`, in a fixed order. Empty when nothing
/// tracked differs.
pub fn classify(
    old: &Declaration,
    old_path: &str,
    new: &Declaration,
    new_path: &str,
    absorbed: &[Declaration],
) -> Vec<Change> {
    let mut changes = Vec::new();

    if old.name != new.name {
        changes.push(Change::new(
            ChangeType::Rename,
            format!("{} -> {}", old.name, new.name),
        ));
    }

    // A local variable follows its method; the method's own history records
    // the move.
    if new.kind != ElementKind::Variable {
        if old.container != new.container {
            changes.push(Change::new(
                ChangeType::Move,
                format!("{} -> {}", old.container, new.container),
            ));
        } else if old_path != new_path {
            changes.push(Change::new(
                ChangeType::Move,
                format!("{} -> {}", old_path, new_path),
            ));
        }
    }

    if old.signature_shape() != new.signature_shape() {
        changes.push(Change::new(
            ChangeType::SignatureChange,
            format!("{} -> {}", old.signature, new.signature),
        ));
    }

    let body_changed = match new.kind {
        ElementKind::Class => old.members != new.members,
        _ => old.body != new.body,
    };
    if body_changed {
        changes.push(Change::new(ChangeType::BodyChange, "body changed"));
    }

    if !absorbed.is_empty() {
        let names: Vec<&str> = absorbed.iter().map(|d| d.key.as_str()).collect();
        changes.push(Change::new(
            ChangeType::InlineMethod,
            format!("inlined {}", names.join(", ")),
        ));
    }

    changes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Higher content similarity first
    Similarity,
    /// Smaller start line displacement first
    LineDelta,
    /// Lexically smaller key (then path) first
    Key,
}

impl TieBreak {
    fn compare(self, a: &Matched, b: &Matched) -> Ordering {
        match self {
            TieBreak::Similarity => b.similarity.total_cmp(&a.similarity),
            TieBreak::LineDelta => a.line_delta.cmp(&b.line_delta),
            TieBreak::Key => (&a.element.key, &a.element.file_path)
                .cmp(&(&b.element.key, &b.element.file_path)),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TieBreak::Similarity => "similarity",
            TieBreak::LineDelta => "line-delta",
            TieBreak::Key => "key",
        })
    }
}

/// Ordered tie-break criteria. `Key` always applies last, so the choice is
/// deterministic whatever the configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TieBreakPolicy(Vec<TieBreak>);

impl TieBreakPolicy {
    pub fn new(mut order: Vec<TieBreak>) -> Self {
        let mut seen = Vec::new();
        order.retain(|c| {
            let fresh = !seen.contains(c);
            seen.push(*c);
            fresh
        });
        if !order.contains(&TieBreak::Key) {
            order.push(TieBreak::Key);
        }
        Self(order)
    }

    pub fn criteria(&self) -> &[TieBreak] {
        &self.0
    }

    pub fn compare(&self, a: &Matched, b: &Matched) -> Ordering {
        self.0
            .iter()
            .map(|c| c.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Chosen candidate and the discarded rest, in preference order.
    /// `None` for an empty candidate list.
    pub fn select(&self, mut candidates: Vec<Matched>) -> Option<(Matched, Vec<Matched>)> {
        candidates.sort_by(|a, b| self.compare(a, b));
        let mut rest = candidates.into_iter();
        let chosen = rest.next()?;
        Some((chosen, rest.collect()))
    }
}

impl Default for TieBreakPolicy {
    fn default() -> Self {
        Self(vec![TieBreak::Similarity, TieBreak::LineDelta, TieBreak::Key])
    }
}

impl fmt::Display for TieBreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for TieBreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let order = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part {
                "similarity" => Ok(TieBreak::Similarity),
                "line-delta" | "line_delta" => Ok(TieBreak::LineDelta),
                "key" => Ok(TieBreak::Key),
                other => Err(format!("unknown tie-break criterion '{}'", other)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if order.is_empty() {
            return Err("empty tie-break policy".to_string());
        }
        Ok(Self::new(order))
    }
}

impl TryFrom<String> for TieBreakPolicy {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TieBreakPolicy> for String {
    fn from(policy: TieBreakPolicy) -> Self {
        policy.to_string()
    }
}
