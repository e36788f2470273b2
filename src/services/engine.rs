//! Investigation Engine
//!
//! Entry point for investigating a case. Routes by category, serializes all
//! work on one case behind a per-case async mutex, owns the per-case
//! cancellation tokens, and makes redelivery idempotent: a case with a
//! stored verdict gets that verdict back unchanged, and a cancelled case
//! reports `Cancelled` again.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use verdict_engine_core::thresholds::micros_to_usd;
use verdict_engine_core::{
    AgentLimits, Case, CoreError, PipelineLimits, SessionStatus, ToolRegistry, Verdict,
    VerdictSummary,
};

use super::agent::{InvestigationAgent, ToolSelector};
use super::cost::CostAccountant;
use super::pipeline::FixedPipeline;
use super::router::{Route, TierRouter};
use super::session::{CaseStore, SessionStore};
use crate::models::{CaseStatusResponse, InvestigationRequest, TrailResponse};
use crate::utils::error::AppError;

/// Result of one investigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum InvestigationOutcome {
    Verdict(Verdict),
    /// Cancelled before concluding; no verdict exists.
    Cancelled,
}

impl InvestigationOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            InvestigationOutcome::Verdict(v) => Some(v),
            InvestigationOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvestigationOutcome::Cancelled)
    }
}

/// Caller-visible engine failures.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported policy category: {0}")]
    UnsupportedCategory(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    /// The case ended in `Failed`; redelivery will not restart it.
    #[error("Case {0} previously failed")]
    PreviouslyFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(AppError),
}

impl EngineError {
    /// Whether redelivering the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_transient())
    }
}

impl From<AppError> for EngineError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) | AppError::Core(CoreError::Validation(msg)) => {
                EngineError::InvalidState(msg)
            }
            AppError::Core(CoreError::UnsupportedCategory(c)) => {
                EngineError::UnsupportedCategory(c)
            }
            AppError::Core(CoreError::InvalidTransition { from, to }) => {
                EngineError::InvalidState(format!("{} -> {}", from, to))
            }
            other => EngineError::Store(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        EngineError::from(AppError::from(err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct InvestigationEngine {
    router: TierRouter,
    pipeline: FixedPipeline,
    agent: InvestigationAgent,
    sessions: Arc<dyn SessionStore>,
    cases: Arc<dyn CaseStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    cancellations: DashMap<String, CancellationToken>,
}

impl InvestigationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        router: TierRouter,
        registry: Arc<ToolRegistry>,
        sessions: Arc<dyn SessionStore>,
        cases: Arc<dyn CaseStore>,
        selector: Arc<dyn ToolSelector>,
        agent_limits: AgentLimits,
        pipeline_limits: PipelineLimits,
    ) -> Self {
        let costs = Arc::new(CostAccountant::new());
        let pipeline = FixedPipeline::new(
            registry.clone(),
            sessions.clone(),
            costs.clone(),
            pipeline_limits,
        );
        let agent = InvestigationAgent::new(
            registry,
            sessions.clone(),
            costs.clone(),
            selector,
            agent_limits,
        );
        Self {
            router,
            pipeline,
            agent,
            sessions,
            cases,
            locks: DashMap::new(),
            cancellations: DashMap::new(),
        }
    }

    /// Store a case for later investigation.
    pub async fn submit_case(&self, case: &Case) -> EngineResult<()> {
        case.validate().map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
        self.router.route(case)?;
        self.cases.put_case(case).await?;
        info!(case_id = %case.id, category = %case.policy_category, "case submitted");
        Ok(())
    }

    /// Investigate a stored case. Safe to call again for the same case.
    pub async fn investigate(
        &self,
        request: &InvestigationRequest,
    ) -> EngineResult<InvestigationOutcome> {
        request.validate().map_err(EngineError::InvalidRequest)?;
        let case_id = request.case_id.as_str();
        let case = self
            .cases
            .get_case(case_id)
            .await?
            .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;

        let route = self.router.route(&case)?;

        let lock = self
            .locks
            .entry(case_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.investigate_locked(&case, route, request.tier).await
        };
        drop(lock);
        self.locks.remove_if(case_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    async fn investigate_locked(
        &self,
        case: &Case,
        route: Route,
        tier: Option<u8>,
    ) -> EngineResult<InvestigationOutcome> {
        if let Some(verdict) = self.sessions.load_verdict(&case.id).await? {
            info!(case_id = %case.id, "verdict already stored");
            return Ok(InvestigationOutcome::Verdict(verdict));
        }
        if let Some(session) = self.sessions.find(&case.id).await? {
            match session.status {
                SessionStatus::Cancelled => return Ok(InvestigationOutcome::Cancelled),
                SessionStatus::Failed => {
                    return Err(EngineError::PreviouslyFailed(case.id.clone()));
                }
                _ => {}
            }
        }

        let token = self
            .cancellations
            .entry(case.id.clone())
            .or_insert_with(CancellationToken::new)
            .clone();

        info!(case_id = %case.id, route = ?route, tier = ?tier, "investigation started");
        let result = match route {
            Route::FixedPipeline => self.pipeline.run(case, tier, &token).await,
            Route::Agent => {
                if let Some(t) = tier {
                    warn!(case_id = %case.id, tier = t, "tier ignored for agent investigation");
                }
                self.agent.run(case, &token).await
            }
        };
        self.cancellations.remove(&case.id);

        result.map_err(EngineError::from)
    }

    /// Request cancellation. Returns `false` when the case already finished.
    pub async fn cancel(&self, case_id: &str) -> EngineResult<bool> {
        if self.cases.get_case(case_id).await?.is_none() {
            return Err(EngineError::CaseNotFound(case_id.to_string()));
        }
        if let Some(session) = self.sessions.find(case_id).await? {
            if session.is_terminal() {
                return Ok(session.status == SessionStatus::Cancelled);
            }
        }
        self.cancellations
            .entry(case_id.to_string())
            .or_insert_with(CancellationToken::new)
            .cancel();
        info!(case_id, "cancellation requested");
        Ok(true)
    }

    /// Current or final state of a case.
    pub async fn status(&self, case_id: &str) -> EngineResult<CaseStatusResponse> {
        if self.cases.get_case(case_id).await?.is_none() {
            return Err(EngineError::CaseNotFound(case_id.to_string()));
        }
        let session = self.sessions.find(case_id).await?;
        let verdict = self.sessions.load_verdict(case_id).await?;
        Ok(CaseStatusResponse {
            case_id: case_id.to_string(),
            status: session.as_ref().map(|s| s.status),
            strategy: session.as_ref().map(|s| s.strategy),
            iteration: session.as_ref().map(|s| s.iteration).unwrap_or(0),
            cost_usd: micros_to_usd(
                session
                    .as_ref()
                    .map(|s| s.cumulative_cost_micros)
                    .unwrap_or(0),
            ),
            verdict,
        })
    }

    /// Full evidence and reasoning trail of a case.
    pub async fn trail(&self, case_id: &str) -> EngineResult<TrailResponse> {
        let session = self
            .sessions
            .find(case_id)
            .await?
            .ok_or_else(|| EngineError::CaseNotFound(case_id.to_string()))?;
        let checkpoints = self.sessions.history(case_id).await?;
        Ok(TrailResponse {
            case_id: case_id.to_string(),
            session,
            checkpoints,
        })
    }

    pub async fn recent_verdicts(&self, limit: usize) -> EngineResult<Vec<VerdictSummary>> {
        Ok(self.sessions.recent_verdicts(limit).await?)
    }
}
