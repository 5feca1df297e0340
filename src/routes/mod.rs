//! API route handlers - maps HTTP endpoints to tracker queries.
//!
//! Each submodule defines routes for a feature area:
//! - `repository`: Basic repo info and cache statistics
//! - `blame`: Line, range, file and element blame
//! - `history`: Element history
//!
//! Queries are synchronous and can walk a lot of history, so they run on the
//! blocking pool. Dropping the request (client went away) cancels the query.

pub mod blame;
pub mod history;
pub mod repository;

use std::sync::Arc;

use axum::Router;

use crate::error::{BlameError, Result};
use crate::git::GitRepository;
use crate::tracker::{QueryControl, Tracker};

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub repo: Arc<GitRepository>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(repository::routes(state.clone()))
        .merge(blame::routes(state.clone()))
        .merge(history::routes(state))
}

/// Run `query` on the blocking pool with the configured timeout.
pub(crate) async fn run_query<T, F>(state: &AppState, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Tracker, &QueryControl) -> Result<T> + Send + 'static,
{
    let tracker = state.tracker.clone();
    let control = tracker.control();
    let _cancel_on_drop = control.token().clone().drop_guard();

    tokio::task::spawn_blocking(move || query(&tracker, &control))
        .await
        .map_err(|e| BlameError::Internal(format!("query task failed: {}", e)))?
}

fn default_commit() -> String {
    "HEAD".to_string()
}
