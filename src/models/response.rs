//! Response Types
//!
//! Standard response envelope and payloads for the status API.

use serde::{Deserialize, Serialize};
use verdict_engine_core::{AgentSession, SessionStatus, Strategy, Verdict};

/// Generic response envelope for every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response with message
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, crate::utils::error::AppError>> for CommandResponse<T> {
    fn from(result: Result<T, crate::utils::error::AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub database: bool,
    pub queue_depth: usize,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: "verdict-engine".to_string(),
            database: false,
            queue_depth: 0,
        }
    }
}

/// Current or final state of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatusResponse {
    pub case_id: String,
    /// `None` until an investigation has started.
    pub status: Option<SessionStatus>,
    pub strategy: Option<Strategy>,
    pub iteration: u32,
    pub cost_usd: f64,
    pub verdict: Option<Verdict>,
}

/// Full audit trail of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailResponse {
    pub case_id: String,
    pub session: AgentSession,
    /// Every checkpoint, oldest first.
    pub checkpoints: Vec<AgentSession>,
}

/// Acknowledgement for accepted asynchronous work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub case_id: String,
    pub accepted: bool,
}
