//! Code Element Locator.
//!
//! Finds concrete `CodeElement`s in a version of a file: by qualified key, by
//! simple name, or by the line they own. Parsed files are memoized per
//! `(commit, path)`; parse failures are memoized too since a historic revision
//! never parses differently the second time.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::{BlameError, MatcherError, Result};
use crate::git::CommitCache;
use crate::models::{CodeElement, ElementKind, Version};
use crate::structure::{Declaration, SourceSnapshot, StructuralModel};

type ParseOutcome = std::result::Result<Arc<ParsedFile>, MatcherError>;

/// One file revision run through the structural model.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: String,
    pub source: Arc<str>,
    pub declarations: Vec<Declaration>,
}

impl ParsedFile {
    pub fn snapshot(&self) -> SourceSnapshot<'_> {
        SourceSnapshot {
            path: &self.path,
            source: &self.source,
            declarations: &self.declarations,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.source.lines().count() as u32
    }

    pub fn find(&self, kind: ElementKind, key: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.kind == kind && d.key == key)
    }

    /// Innermost declaration covering `line`. Lines outside every declaration
    /// belong to the first top-level class.
    pub fn owner_of(&self, line: u32) -> Option<&Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.start_line <= line && line <= d.end_line)
            .min_by_key(|d| (d.end_line - d.start_line, std::cmp::Reverse(d.start_line)))
            .or_else(|| {
                self.declarations
                    .iter()
                    .find(|d| d.kind == ElementKind::Class)
            })
    }
}

pub struct ElementLocator {
    cache: Arc<CommitCache>,
    model: Arc<dyn StructuralModel>,
    parsed: DashMap<(String, String), ParseOutcome>,
}

impl ElementLocator {
    pub fn new(cache: Arc<CommitCache>, model: Arc<dyn StructuralModel>) -> Self {
        Self {
            cache,
            model,
            parsed: DashMap::new(),
        }
    }

    pub fn model(&self) -> &Arc<dyn StructuralModel> {
        &self.model
    }

    pub fn cache(&self) -> &Arc<CommitCache> {
        &self.cache
    }

    /// Parse `path` at `commit_id`; `Ok(None)` if the file does not exist there.
    pub fn parse(&self, commit_id: &str, path: &str) -> Result<Option<Arc<ParsedFile>>> {
        if !self.model.supports(path) {
            return Err(MatcherError::Unsupported(path.to_string()).into());
        }

        let key = (commit_id.to_string(), path.to_string());
        if let Some(outcome) = self.parsed.get(&key) {
            return Ok(Some(outcome.clone()?));
        }

        let Some(source) = self.cache.file_content(commit_id, path)? else {
            return Ok(None);
        };

        let outcome = self
            .model
            .declarations(path, &source)
            .map(|declarations| {
                Arc::new(ParsedFile {
                    path: path.to_string(),
                    source: source.clone(),
                    declarations,
                })
            })
            .map_err(|reason| MatcherError::Parse {
                commit: commit_id.to_string(),
                path: path.to_string(),
                reason,
            });

        let outcome = self.parsed.entry(key).or_insert(outcome).clone();
        Ok(Some(outcome?))
    }

    /// Like `parse`, but a missing file is `NotFound`.
    pub fn parse_existing(&self, version: &Version, path: &str) -> Result<Arc<ParsedFile>> {
        self.parse(&version.id, path)?.ok_or_else(|| {
            BlameError::NotFound(format!("{} does not exist at {}", path, version.short_id()))
        })
    }

    /// Element owning `line` of `path` at `version`.
    pub fn find_by_line(&self, version: &Arc<Version>, path: &str, line: u32) -> Result<CodeElement> {
        if line == 0 {
            return Err(BlameError::InvalidQuery("line numbers start at 1".to_string()));
        }
        let file = self.parse_existing(version, path)?;
        if line > file.line_count() {
            return Err(BlameError::NotFound(format!(
                "{} has {} lines at {}, line {} requested",
                path,
                file.line_count(),
                version.short_id(),
                line
            )));
        }

        file.owner_of(line)
            .map(|d| d.to_element(path, version.clone()))
            .ok_or_else(|| {
                BlameError::NotFound(format!(
                    "no declaration owns line {} of {} at {}",
                    line,
                    path,
                    version.short_id()
                ))
            })
    }

    /// Element with qualified key `query`, or the only element whose simple
    /// name (or key without parameter list) is `query`. Without a path hint
    /// every supported file of the version is searched.
    pub fn find_by_key(
        &self,
        version: &Arc<Version>,
        query: &str,
        path_hint: Option<&str>,
    ) -> Result<CodeElement> {
        let paths: Vec<String> = match path_hint {
            Some(path) => vec![path.to_string()],
            None => self
                .cache
                .files(&version.id)?
                .iter()
                .filter(|p| self.model.supports(p))
                .cloned()
                .collect(),
        };

        let mut exact = Vec::new();
        let mut loose = Vec::new();
        for path in &paths {
            let file = match self.parse(&version.id, path) {
                Ok(Some(file)) => file,
                Ok(None) if path_hint.is_some() => {
                    return Err(BlameError::NotFound(format!(
                        "{} does not exist at {}",
                        path,
                        version.short_id()
                    )));
                }
                Ok(None) => continue,
                // An unrelated broken file must not fail a repository-wide search.
                Err(BlameError::Matcher(e)) if path_hint.is_none() => {
                    debug!(path = %path, error = %e, "Skipping unparsable file");
                    continue;
                }
                Err(e) => return Err(e),
            };

            for decl in &file.declarations {
                if decl.key == query {
                    exact.push(decl.to_element(path, version.clone()));
                } else if matches_loosely(decl, query) {
                    loose.push(decl.to_element(path, version.clone()));
                }
            }
        }

        let mut candidates = if exact.is_empty() { loose } else { exact };
        if candidates.len() > 1 {
            return Err(BlameError::AmbiguousKey {
                query: query.to_string(),
                candidates: candidates
                    .iter()
                    .map(|c| format!("{} ({})", c.key, c.file_path))
                    .collect(),
            });
        }
        candidates.pop().ok_or_else(|| {
            BlameError::NotFound(format!("no element '{}' at {}", query, version.short_id()))
        })
    }
}

fn matches_loosely(decl: &Declaration, query: &str) -> bool {
    decl.name == query
        || decl
            .key
            .strip_prefix(query)
            .is_some_and(|rest| rest.starts_with('('))
}
