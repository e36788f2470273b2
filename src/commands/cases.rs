//! Case Commands
//!
//! Submit cases, trigger and cancel investigations, and read back status
//! and the evidence trail.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};

use super::{engine_error, ok, queue_error, respond, ApiResponse, SharedState};
use crate::models::queue::{CaseSubmission, InvestigateBody, InvestigationRequest};
use crate::models::response::{AcceptedResponse, CaseStatusResponse, TrailResponse};
use crate::services::engine::EngineError;

pub fn case_routes() -> Router<SharedState> {
    Router::new()
        .route("/v1/cases", post(submit_case))
        .route("/v1/cases/:id", get(get_case_status))
        .route("/v1/cases/:id/investigate", post(investigate_case))
        .route("/v1/cases/:id/cancel", post(cancel_case))
        .route("/v1/cases/:id/trail", get(get_case_trail))
}

/// Store a case; investigation is triggered separately.
async fn submit_case(
    State(state): State<SharedState>,
    body: Result<Json<CaseSubmission>, JsonRejection>,
) -> ApiResponse<AcceptedResponse> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "case submission rejected");
            return engine_error(EngineError::InvalidRequest(rejection.body_text()));
        }
    };
    let case = match body.into_case() {
        Ok(case) => case,
        Err(e) => return engine_error(e.into()),
    };
    match state.engine().submit_case(&case).await {
        Ok(()) => ok(
            StatusCode::CREATED,
            AcceptedResponse {
                case_id: case.id,
                accepted: true,
            },
        ),
        Err(e) => engine_error(e),
    }
}

/// Queue an investigation for an existing case.
async fn investigate_case(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Option<Json<InvestigateBody>>,
) -> ApiResponse<AcceptedResponse> {
    if let Err(e) = state.engine().status(&id).await {
        return engine_error(e);
    }
    let tier = body.and_then(|Json(b)| b.tier);
    let request = InvestigationRequest { case_id: id, tier };
    let case_id = request.case_id.clone();
    match state.queue().enqueue(request) {
        Ok(()) => ok(
            StatusCode::ACCEPTED,
            AcceptedResponse {
                case_id,
                accepted: true,
            },
        ),
        Err(e) => queue_error(e),
    }
}

async fn cancel_case(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResponse<AcceptedResponse> {
    let result = state.engine().cancel(&id).await.map(|accepted| {
        info!(case_id = %id, accepted, "cancel requested over http");
        AcceptedResponse {
            case_id: id,
            accepted,
        }
    });
    respond(StatusCode::OK, result)
}

async fn get_case_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResponse<CaseStatusResponse> {
    respond(StatusCode::OK, state.engine().status(&id).await)
}

async fn get_case_trail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResponse<TrailResponse> {
    respond(StatusCode::OK, state.engine().trail(&id).await)
}
