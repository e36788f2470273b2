//! Verdict Commands

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use verdict_engine_core::VerdictSummary;

use super::{respond, ApiResponse, SharedState};

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub fn verdict_routes() -> Router<SharedState> {
    Router::new().route("/v1/verdicts/recent", get(recent_verdicts))
}

/// Most recent verdicts, newest first.
async fn recent_verdicts(
    State(state): State<SharedState>,
    Query(query): Query<RecentQuery>,
) -> ApiResponse<Vec<VerdictSummary>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    respond(StatusCode::OK, state.engine().recent_verdicts(limit).await)
}
