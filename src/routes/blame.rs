//! Blame endpoints.
//!
//! - GET /api/v1/blame/line?path=<path>&line=<n>&commit=<optional>
//! - GET /api/v1/blame/range?path=<path>&from=<n>&to=<n>&commit=<optional>
//! - GET /api/v1/blame/file?path=<path>&commit=<optional>
//! - GET /api/v1/blame/element?key=<key>&path=<optional>&commit=<optional>
//!
//! `commit` is any revision expression and defaults to HEAD.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{default_commit, run_query, AppState};
use crate::error::Result;
use crate::models::{BlameResponse, BlameResult};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/blame/line", get(blame_line))
        .route("/api/v1/blame/range", get(blame_range))
        .route("/api/v1/blame/file", get(blame_file))
        .route("/api/v1/blame/element", get(blame_element))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LineQuery {
    path: String,
    line: u32,
    #[serde(default = "default_commit")]
    commit: String,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    path: String,
    from: u32,
    to: u32,
    #[serde(default = "default_commit")]
    commit: String,
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    path: String,
    #[serde(default = "default_commit")]
    commit: String,
}

#[derive(Debug, Deserialize)]
struct ElementQuery {
    key: String,
    path: Option<String>,
    #[serde(default = "default_commit")]
    commit: String,
}

async fn blame_line(
    State(state): State<AppState>,
    Query(query): Query<LineQuery>,
) -> Result<Json<BlameResult>> {
    let result = run_query(&state, move |tracker, control| {
        let version = tracker.resolve_version(&query.commit)?;
        tracker.blame_line(&version, &query.path, query.line, control)
    })
    .await?;
    Ok(Json(result))
}

async fn blame_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BlameResponse>> {
    let response = run_query(&state, move |tracker, control| {
        let version = tracker.resolve_version(&query.commit)?;
        tracker.blame_range(&version, &query.path, query.from, query.to, control)
    })
    .await?;
    Ok(Json(response))
}

async fn blame_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Json<BlameResponse>> {
    let response = run_query(&state, move |tracker, control| {
        let version = tracker.resolve_version(&query.commit)?;
        tracker.blame_file(&version, &query.path, control)
    })
    .await?;
    Ok(Json(response))
}

async fn blame_element(
    State(state): State<AppState>,
    Query(query): Query<ElementQuery>,
) -> Result<Json<BlameResult>> {
    let result = run_query(&state, move |tracker, control| {
        let version = tracker.resolve_version(&query.commit)?;
        tracker.blame_element(&version, &query.key, query.path.as_deref(), control)
    })
    .await?;
    Ok(Json(result))
}
