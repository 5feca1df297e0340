//! Element history endpoint.
//!
//! GET /api/v1/history?key=<key>&path=<optional>&commit=<optional>&include_no_change=<bool>
//!
//! Returns every edge behind the element, newest first, and where each line
//! of ancestry ends. Edges that changed nothing are left out unless
//! `include_no_change` is set.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{default_commit, run_query, AppState};
use crate::error::Result;
use crate::models::HistoryView;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/history", get(get_history))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    key: String,
    path: Option<String>,
    #[serde(default = "default_commit")]
    commit: String,
    #[serde(default)]
    include_no_change: bool,
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryView>> {
    let view = run_query(&state, move |tracker, control| {
        let version = tracker.resolve_version(&query.commit)?;
        tracker.track_history(
            &version,
            &query.key,
            query.path.as_deref(),
            query.include_no_change,
            control,
        )
    })
    .await?;
    Ok(Json(view))
}
