//! Repository info and cache statistics.
//!
//! - GET /api/v1/repository: path, current branch and HEAD commit
//! - GET /api/v1/cache/stats: commit cache and history graph sizes

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::{run_query, AppState};
use crate::error::Result;
use crate::git::CacheStats;
use crate::models::Version;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/repository", get(get_repository_info))
        .route("/api/v1/cache/stats", get(get_cache_stats))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct RepositoryInfo {
    path: String,
    head_branch: Option<String>,
    head_commit: Option<Version>,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStats,
    graph_nodes: usize,
    graph_edges: usize,
}

async fn get_repository_info(State(state): State<AppState>) -> Result<Json<RepositoryInfo>> {
    let path = state.repo.path.clone();
    let head_branch = state.repo.head_branch()?;
    // An empty repository has no HEAD commit.
    let head_commit = run_query(&state, |tracker, _| {
        Ok(tracker.resolve_version("HEAD").ok().map(|v| (*v).clone()))
    })
    .await?;

    Ok(Json(RepositoryInfo {
        path,
        head_branch,
        head_commit,
    }))
}

async fn get_cache_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let graph = state.tracker.graph();
    Ok(Json(StatsResponse {
        cache: state.tracker.cache_stats(),
        graph_nodes: graph.node_count()?,
        graph_edges: graph.edge_count()?,
    }))
}
