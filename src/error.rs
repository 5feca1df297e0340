//! Error taxonomy for blame queries and HTTP response mapping.
//!
//! - `RepositoryError`: commit/blob/tree could not be read
//! - `MatcherError`: the structural model could not handle a historic revision
//! - `BlameError`: what a query returns to its caller
//!
//! `BlameError` implements Axum's `IntoResponse` so route handlers can return
//! it directly. Error mappings:
//! - `NotFound`, `Repository(CommitNotFound)` → 404
//! - `InvalidQuery`, `AmbiguousKey` → 400
//! - `Cancelled` → 408, `TimedOut` → 504
//! - everything else → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("{path} is not a file at {commit}")]
    NotAFile { commit: String, path: String },

    #[error("Repository lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error("cannot parse {path} at {commit}: {reason}")]
    Parse {
        commit: String,
        path: String,
        reason: String,
    },

    #[error("no structural model for {0}")]
    Unsupported(String),

    #[error("element {key} is not present at {commit}")]
    MissingElement { key: String, commit: String },
}

#[derive(Error, Debug)]
pub enum BlameError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("history walk of {element} stopped at {commit}: {source}")]
    Walk {
        commit: String,
        element: String,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("'{query}' matches several elements: {}", .candidates.join(", "))]
    AmbiguousKey {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Query timed out")]
    TimedOut,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlameError {
    /// Attach the point a history walk reached when the repository failed.
    pub fn at(commit: &str, element: &str, source: RepositoryError) -> Self {
        BlameError::Walk {
            commit: commit.to_string(),
            element: element.to_string(),
            source,
        }
    }
}

impl IntoResponse for BlameError {
    fn into_response(self) -> Response {
        let status = match &self {
            BlameError::NotFound(_)
            | BlameError::Repository(RepositoryError::CommitNotFound(_))
            | BlameError::Repository(RepositoryError::RepoNotFound(_)) => StatusCode::NOT_FOUND,
            BlameError::InvalidQuery(_) | BlameError::AmbiguousKey { .. } => {
                StatusCode::BAD_REQUEST
            }
            BlameError::Matcher(MatcherError::Unsupported(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            BlameError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            BlameError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
            BlameError::Repository(_)
            | BlameError::Walk { .. }
            | BlameError::Matcher(_)
            | BlameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BlameError>;
