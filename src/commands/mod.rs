//! HTTP Commands
//!
//! Route handlers for the status API. Every handler answers with the
//! `CommandResponse` envelope and an HTTP status derived from the error.

pub mod cases;
pub mod health;
pub mod verdicts;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;

use crate::models::response::CommandResponse;
use crate::services::engine::EngineError;
use crate::services::queue::QueueError;
use crate::state::AppState;

pub use cases::case_routes;
pub use health::health_routes;
pub use verdicts::verdict_routes;

pub type SharedState = Arc<AppState>;

/// Status code plus envelope, as returned by every handler.
pub type ApiResponse<T> = (StatusCode, Json<CommandResponse<T>>);

pub(crate) fn ok<T>(status: StatusCode, data: T) -> ApiResponse<T> {
    (status, Json(CommandResponse::ok(data)))
}

pub(crate) fn engine_error<T>(err: EngineError) -> ApiResponse<T> {
    let status = match &err {
        EngineError::CaseNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::UnsupportedCategory(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidState(_) | EngineError::PreviouslyFailed(_) => StatusCode::CONFLICT,
        EngineError::Store(e) => {
            tracing::error!(error = %e, "storage failure while serving request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(CommandResponse::err(err.to_string())))
}

pub(crate) fn queue_error<T>(err: QueueError) -> ApiResponse<T> {
    let status = match err {
        QueueError::Invalid(_) => StatusCode::BAD_REQUEST,
        QueueError::Full | QueueError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(CommandResponse::err(err.to_string())))
}

pub(crate) fn respond<T>(status: StatusCode, result: Result<T, EngineError>) -> ApiResponse<T> {
    match result {
        Ok(data) => ok(status, data),
        Err(e) => engine_error(e),
    }
}
