//! Structural source model consumed by the history walk.
//!
//! The tracker never parses source itself. A `StructuralModel` turns file text
//! into `Declaration`s and, given two revisions of a file, names the
//! counterparts a declaration has in the older one. The `ElementMatcher`
//! translates those facts into match verdicts and change lists.
//!
//! `brace::BraceModel` is the built-in model for brace-delimited languages.

pub mod brace;

use std::collections::HashMap;
use std::sync::Arc;

use similar::{Algorithm, DiffOp};

use crate::models::{CodeElement, ElementKind, Version};

pub use brace::{BraceModel, ModelConfig};

/// One declaration found in a file revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: ElementKind,
    pub key: String,
    pub name: String,
    /// Key of the enclosing class or method, or the package for top-level types
    pub container: String,
    /// Normalized declaration header (modifiers, type, name, parameters)
    pub signature: String,
    /// Normalized body lines (method body, or initializer for fields and variables)
    pub body: Vec<String>,
    /// Member signatures of a class, sorted
    pub members: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl Declaration {
    /// Signature with the declared name blanked out, so renames alone do not
    /// register as signature changes.
    pub fn signature_shape(&self) -> String {
        replace_word(&self.signature, &self.name, "_")
    }

    /// Body lines that carry content (no lone braces).
    pub fn significant_body(&self) -> Vec<&str> {
        self.body
            .iter()
            .map(String::as_str)
            .filter(|line| !matches!(*line, "" | "{" | "}" | "};" | "})" | "});"))
            .collect()
    }

    pub fn to_element(&self, file_path: &str, version: Arc<Version>) -> CodeElement {
        CodeElement {
            kind: self.kind,
            key: self.key.clone(),
            name: self.name.clone(),
            container: self.container.clone(),
            file_path: file_path.to_string(),
            start_line: self.start_line,
            end_line: self.end_line,
            version,
        }
    }
}

/// A file revision handed to the model for comparison.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot<'a> {
    pub path: &'a str,
    pub source: &'a str,
    pub declarations: &'a [Declaration],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The old declaration is the same element, possibly transformed
    Correspondent,
    /// The new method's body was extracted from the old declaration
    ExtractedFrom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Counterpart {
    pub declaration: Declaration,
    /// 0.0..=1.0
    pub similarity: f64,
    pub relation: Relation,
    /// Old declarations that vanished and whose bodies were inlined here
    pub absorbed: Vec<Declaration>,
}

/// Inclusive 1-indexed line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn whole(source: &str) -> Self {
        Self::new(1, source.lines().count().max(1) as u32)
    }

    pub fn len(&self) -> usize {
        (self.end.saturating_sub(self.start) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

pub trait StructuralModel: Send + Sync {
    fn supports(&self, path: &str) -> bool;

    /// Declarations in `source`; `Err` carries a human-readable parse failure.
    fn declarations(&self, path: &str, source: &str) -> Result<Vec<Declaration>, String>;

    /// Counterparts of `target` (a declaration of `new`) in `old`.
    ///
    /// `successor` is `old.path` as it stands in the new revision, `None` if
    /// the file was deleted. A declaration still present there under its own
    /// key has its own history and is never a counterpart of `target`.
    fn counterparts(
        &self,
        old: &SourceSnapshot<'_>,
        new: &SourceSnapshot<'_>,
        successor: Option<&SourceSnapshot<'_>>,
        target: &Declaration,
    ) -> Vec<Counterpart>;

    /// For each line of `new_range`, the corresponding line of `old_range`.
    fn line_correspondence(
        &self,
        old: &str,
        old_range: LineRange,
        new: &str,
        new_range: LineRange,
    ) -> Vec<Option<u32>> {
        correspond_lines(old, old_range, new, new_range)
    }
}

/// Collapse whitespace, keeping a single space only between two word characters.
pub fn normalize_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            if out.chars().last().is_some_and(is_word_char) && is_word_char(c) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }

    out
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn replace_word(text: &str, word: &str, with: &str) -> String {
    if word.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(word) {
        let before = rest[..pos].chars().last();
        let after = rest[pos + word.len()..].chars().next();
        out.push_str(&rest[..pos]);
        if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
            out.push_str(word);
        } else {
            out.push_str(with);
        }
        rest = &rest[pos + word.len()..];
    }
    out.push_str(rest);
    out
}

fn normalized_lines(source: &str, range: LineRange) -> Vec<String> {
    source
        .lines()
        .skip(range.start.saturating_sub(1) as usize)
        .take(range.len())
        .map(normalize_code)
        .collect()
}

/// Line correspondence over whitespace-normalized text.
pub fn correspond_lines(
    old: &str,
    old_range: LineRange,
    new: &str,
    new_range: LineRange,
) -> Vec<Option<u32>> {
    let old_lines = normalized_lines(old, old_range);
    let new_lines = normalized_lines(new, new_range);
    let mut map = vec![None; new_range.len()];

    for op in similar::capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines) {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = op
        {
            for i in 0..len {
                if let Some(slot) = map.get_mut(new_index + i) {
                    *slot = Some(old_range.start + (old_index + i) as u32);
                }
            }
        }
    }

    map
}

/// Dice coefficient over the longest common line subsequence.
pub fn similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matched: usize = similar::capture_diff_slices(Algorithm::Myers, a, b)
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    (2 * matched) as f64 / (a.len() + b.len()) as f64
}

/// Fraction of `part`'s lines (as a multiset) that also occur in `whole`.
pub fn containment(part: &[&str], whole: &[&str]) -> f64 {
    if part.is_empty() {
        return 0.0;
    }
    let mut available: HashMap<&str, usize> = HashMap::new();
    for line in whole {
        *available.entry(*line).or_default() += 1;
    }
    let found = part
        .iter()
        .filter(|line| match available.get_mut(*line) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        })
        .count();
    found as f64 / part.len() as f64
}
