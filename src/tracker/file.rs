//! File Tracker: one file at one version, line by line.

use std::sync::Arc;

use crate::error::{BlameError, Result};
use crate::models::{BlameResponse, BlameResult, CodeElement, Version};
use crate::tracker::blame::BlameResolver;
use crate::tracker::control::QueryControl;
use crate::tracker::locator::{ElementLocator, ParsedFile};

pub struct FileTracker<'r> {
    resolver: &'r BlameResolver,
    version: Arc<Version>,
    file: Arc<ParsedFile>,
    /// Owning element per physical line, index 0 is line 1
    owners: Vec<Option<CodeElement>>,
}

impl<'r> FileTracker<'r> {
    pub fn open(
        resolver: &'r BlameResolver,
        locator: &ElementLocator,
        version: Arc<Version>,
        path: &str,
    ) -> Result<Self> {
        let file = locator.parse_existing(&version, path)?;
        let owners = (1..=file.line_count())
            .map(|line| file.owner_of(line).map(|d| d.to_element(path, version.clone())))
            .collect();

        Ok(Self {
            resolver,
            version,
            file,
            owners,
        })
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    pub fn line_count(&self) -> u32 {
        self.owners.len() as u32
    }

    pub fn owner(&self, line: u32) -> Result<&CodeElement> {
        if line == 0 {
            return Err(BlameError::InvalidQuery("line numbers start at 1".to_string()));
        }
        self.owners
            .get(line as usize - 1)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                BlameError::NotFound(format!(
                    "no element owns line {} of {} at {}",
                    line,
                    self.file.path,
                    self.version.short_id()
                ))
            })
    }

    /// One result per line of `from..=to`, in line order. Graph expansion and
    /// line maps are shared across the lines.
    pub fn blame_range(&self, from: u32, to: u32, control: &QueryControl) -> Result<BlameResponse> {
        if from == 0 || from > to {
            return Err(BlameError::InvalidQuery(format!(
                "invalid line range {}..{}",
                from, to
            )));
        }
        if to > self.line_count() {
            return Err(BlameError::NotFound(format!(
                "{} has {} lines at {}, line {} requested",
                self.file.path,
                self.line_count(),
                self.version.short_id(),
                to
            )));
        }

        let mut lines = self.resolver.line_mapper();
        let results = (from..=to)
            .map(|line| {
                let owner = self.owner(line)?;
                self.resolver.blame_line(owner, line, &mut lines, control)
            })
            .collect::<Result<Vec<BlameResult>>>()?;

        Ok(BlameResponse {
            path: self.file.path.clone(),
            commit: self.version.id.clone(),
            lines: results,
        })
    }

    pub fn blame_all(&self, control: &QueryControl) -> Result<BlameResponse> {
        if self.line_count() == 0 {
            return Ok(BlameResponse {
                path: self.file.path.clone(),
                commit: self.version.id.clone(),
                lines: Vec::new(),
            });
        }
        self.blame_range(1, self.line_count(), control)
    }
}
