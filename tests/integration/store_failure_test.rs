//! Store Failure Integration Tests
//!
//! A write that fails mid-investigation ends the case as `Failed`:
//! - no further tool calls in the failing run
//! - redelivery reports the failure instead of spending again
//! - no verdict is left behind

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use verdict_engine::models::InvestigationRequest;
use verdict_engine::services::agent::HeuristicSelector;
use verdict_engine::services::engine::{EngineError, InvestigationEngine};
use verdict_engine::services::router::TierRouter;
use verdict_engine::services::session::{CaseStore, MemorySessionStore, SessionStore};
use verdict_engine::{AppError, AppResult};
use verdict_engine_core::{
    AgentLimits, AgentSession, Case, PipelineLimits, PolicyCategory, SessionStatus, ToolKind,
    Verdict, VerdictSummary,
};

use crate::support::{case, registry_of, ScriptedTool, Step};

/// Memory store whose n-th checkpoint, or first verdict write, fails once.
struct FailingStore {
    inner: MemorySessionStore,
    checkpoints: AtomicU32,
    fail_checkpoint: Option<u32>,
    fail_verdict: AtomicBool,
}

impl FailingStore {
    /// Checkpoint 1 is session creation, 2 the first tier or iteration.
    fn failing_checkpoint(n: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::new(),
            checkpoints: AtomicU32::new(0),
            fail_checkpoint: Some(n),
            fail_verdict: AtomicBool::new(false),
        })
    }

    fn failing_verdict() -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::new(),
            checkpoints: AtomicU32::new(0),
            fail_checkpoint: None,
            fail_verdict: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn checkpoint(&self, session: &AgentSession) -> AppResult<()> {
        let n = self.checkpoints.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_checkpoint == Some(n) {
            return Err(AppError::database("disk full"));
        }
        self.inner.checkpoint(session).await
    }

    async fn find(&self, case_id: &str) -> AppResult<Option<AgentSession>> {
        self.inner.find(case_id).await
    }

    async fn history(&self, case_id: &str) -> AppResult<Vec<AgentSession>> {
        self.inner.history(case_id).await
    }

    async fn record_verdict(&self, session: &AgentSession, verdict: &Verdict) -> AppResult<()> {
        if self.fail_verdict.swap(false, Ordering::SeqCst) {
            return Err(AppError::database("disk full"));
        }
        self.inner.record_verdict(session, verdict).await
    }

    async fn load_verdict(&self, case_id: &str) -> AppResult<Option<Verdict>> {
        self.inner.load_verdict(case_id).await
    }

    async fn recent_verdicts(&self, limit: usize) -> AppResult<Vec<VerdictSummary>> {
        self.inner.recent_verdicts(limit).await
    }
}

#[async_trait]
impl CaseStore for FailingStore {
    async fn put_case(&self, case: &Case) -> AppResult<()> {
        self.inner.put_case(case).await
    }

    async fn get_case(&self, case_id: &str) -> AppResult<Option<Case>> {
        self.inner.get_case(case_id).await
    }
}

fn engine_over(tool: &Arc<ScriptedTool>, store: &Arc<FailingStore>) -> InvestigationEngine {
    InvestigationEngine::new(
        TierRouter::default(),
        registry_of(&[tool.clone()]),
        store.clone(),
        store.clone(),
        Arc::new(HeuristicSelector::default()),
        AgentLimits::default(),
        PipelineLimits::default(),
    )
}

/// Run a case whose store fails once, then redeliver it.
async fn run_to_failure(tool: &Arc<ScriptedTool>, store: &Arc<FailingStore>, case: Case) {
    let engine = engine_over(tool, store);
    engine.submit_case(&case).await.unwrap();
    let request = InvestigationRequest::new(case.id.clone());

    let err = engine.investigate(&request).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(err.is_retryable());
    let calls = tool.calls();
    assert_eq!(calls, 1);

    let session = store.load(&case.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session
        .reasoning
        .last()
        .unwrap()
        .contains("investigation failed"));

    let err = engine.investigate(&request).await.unwrap_err();
    assert!(matches!(err, EngineError::PreviouslyFailed(_)));
    assert_eq!(tool.calls(), calls);
    assert!(store.load_verdict(&case.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pipeline_checkpoint_failure_fails_case() {
    // Tier 1 is below the threshold, so only the failed write stops escalation.
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.5, 0.5));
    let store = FailingStore::failing_checkpoint(2);

    run_to_failure(&tool, &store, case("f-1", PolicyCategory::Plagiarism)).await;
}

#[tokio::test]
async fn test_pipeline_verdict_failure_fails_case() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let store = FailingStore::failing_verdict();

    run_to_failure(&tool, &store, case("f-2", PolicyCategory::Plagiarism)).await;
}

#[tokio::test]
async fn test_agent_checkpoint_failure_fails_case() {
    let tool = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.4, 0.4));
    let store = FailingStore::failing_checkpoint(2);

    run_to_failure(&tool, &store, case("f-3", PolicyCategory::Harassment)).await;
}

#[tokio::test]
async fn test_agent_verdict_failure_fails_case() {
    let tool = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.9, 0.9));
    let store = FailingStore::failing_verdict();

    run_to_failure(&tool, &store, case("f-4", PolicyCategory::Harassment)).await;
}
