//! Health Check Commands
//!
//! Reports database reachability and queue depth.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use super::{ok, ApiResponse, SharedState};
use crate::models::response::HealthResponse;

pub fn health_routes() -> Router<SharedState> {
    Router::new().route("/v1/health", get(get_health))
}

/// Get the health status of the engine
async fn get_health(State(state): State<SharedState>) -> ApiResponse<HealthResponse> {
    let mut health = HealthResponse::default();
    health.database = state.is_database_healthy();
    health.queue_depth = state.queue().depth();

    let status = if health.database {
        StatusCode::OK
    } else {
        health.status = "degraded".to_string();
        StatusCode::SERVICE_UNAVAILABLE
    };
    ok(status, health)
}
