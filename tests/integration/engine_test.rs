//! Engine Integration Tests
//!
//! The idempotent entry point and the queue worker feeding it:
//! - Redelivery of a concluded case returns the stored verdict
//! - Concurrent deliveries of one case investigate it once
//! - Unsupported categories, failed and cancelled cases
//! - Queue-driven investigations over SQLite

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use verdict_engine::models::{InvestigationRequest, WorkerConfig};
use verdict_engine::services::agent::HeuristicSelector;
use verdict_engine::services::engine::{EngineError, InvestigationEngine, InvestigationOutcome};
use verdict_engine::services::queue::QueueWorker;
use verdict_engine::services::router::TierRouter;
use verdict_engine::services::session::{
    CaseStore, MemorySessionStore, SessionStore, SqliteSessionStore,
};
use verdict_engine::storage::Database;
use verdict_engine_core::{
    AgentLimits, PipelineLimits, PolicyCategory, SessionStatus, Strategy, ToolKind, ToolRegistry,
};

use crate::support::{case, registry_of, ScriptedTool, Step};

fn engine_with(
    router: TierRouter,
    registry: Arc<ToolRegistry>,
    store: Arc<MemorySessionStore>,
) -> InvestigationEngine {
    InvestigationEngine::new(
        router,
        registry,
        store.clone(),
        store,
        Arc::new(HeuristicSelector::default()),
        AgentLimits::default(),
        PipelineLimits::default(),
    )
}

#[tokio::test]
async fn test_redelivery_returns_stored_verdict() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::default(),
        registry_of(&[tool.clone()]),
        store.clone(),
    );
    engine
        .submit_case(&case("e-1", PolicyCategory::Plagiarism))
        .await
        .unwrap();

    let request = InvestigationRequest::new("e-1");
    let first = engine.investigate(&request).await.unwrap();
    let second = engine.investigate(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(tool.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_deliveries_investigate_once() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::default(),
        registry_of(&[tool.clone()]),
        store.clone(),
    );
    engine
        .submit_case(&case("e-2", PolicyCategory::Plagiarism))
        .await
        .unwrap();

    let request = InvestigationRequest::new("e-2");
    let outcomes = join_all((0..4).map(|_| engine.investigate(&request))).await;

    assert_eq!(tool.calls(), 1);
    let verdicts: Vec<_> = outcomes
        .into_iter()
        .map(|o| o.unwrap().verdict().cloned().expect("verdict"))
        .collect();
    assert!(verdicts.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_unsupported_category_is_rejected() {
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::new([PolicyCategory::Plagiarism]),
        Arc::new(ToolRegistry::new()),
        store.clone(),
    );
    // Stored directly; the router refuses it at investigation time.
    store
        .put_case(&case("e-3", PolicyCategory::Nsfw))
        .await
        .unwrap();

    let err = engine
        .investigate(&InvestigationRequest::new("e-3"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedCategory(ref c) if c == "nsfw"));
    assert!(store.find("e-3").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tier_is_ignored_for_agent_categories() {
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.95, 0.9));
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::default(),
        registry_of(&[text.clone()]),
        store.clone(),
    );
    engine
        .submit_case(&case("e-4", PolicyCategory::Harassment))
        .await
        .unwrap();

    let outcome = engine
        .investigate(&InvestigationRequest::at_tier("e-4", 3))
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");
    assert_eq!(verdict.strategy, Strategy::Agent);
    assert_eq!(text.calls(), 1);
}

#[tokio::test]
async fn test_cancel_before_start_and_redelivery() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::default(),
        registry_of(&[tool.clone()]),
        store.clone(),
    );
    engine
        .submit_case(&case("e-5", PolicyCategory::Plagiarism))
        .await
        .unwrap();

    assert!(engine.cancel("e-5").await.unwrap());
    let request = InvestigationRequest::new("e-5");
    assert_eq!(
        engine.investigate(&request).await.unwrap(),
        InvestigationOutcome::Cancelled
    );
    assert_eq!(
        engine.investigate(&request).await.unwrap(),
        InvestigationOutcome::Cancelled
    );
    assert_eq!(tool.calls(), 0);

    let status = engine.status("e-5").await.unwrap();
    assert_eq!(status.status, Some(SessionStatus::Cancelled));
    assert!(status.verdict.is_none());
    assert_eq!(status.cost_usd, 0.0);

    // Cancelling a finished case is a no-op that reports its state.
    assert!(engine.cancel("e-5").await.unwrap());
    assert!(matches!(
        engine.cancel("ghost").await,
        Err(EngineError::CaseNotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_case_is_not_restarted() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let store = Arc::new(MemorySessionStore::new());
    let engine = engine_with(
        TierRouter::default(),
        registry_of(&[tool.clone()]),
        store.clone(),
    );
    engine
        .submit_case(&case("e-6", PolicyCategory::Plagiarism))
        .await
        .unwrap();

    let mut session = store.create("e-6", Strategy::FixedPipeline).await.unwrap();
    session.finish(SessionStatus::Failed).unwrap();
    store.checkpoint(&session).await.unwrap();

    let err = engine
        .investigate(&InvestigationRequest::new("e-6"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreviouslyFailed(_)));
    assert!(!err.is_retryable());
    assert_eq!(tool.calls(), 0);
}

#[tokio::test]
async fn test_queue_worker_drains_cases_over_sqlite() {
    let visual = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.9, 0.9));
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.95, 0.2));
    let db = Database::new_in_memory().unwrap();
    let store = Arc::new(SqliteSessionStore::new(&db));
    let engine = Arc::new(InvestigationEngine::new(
        TierRouter::default(),
        registry_of(&[visual, text]),
        store.clone(),
        store.clone(),
        Arc::new(HeuristicSelector::default()),
        AgentLimits::default(),
        PipelineLimits::default(),
    ));

    let ids = ["q-1", "q-2", "q-3", "q-4"];
    for (i, id) in ids.iter().enumerate() {
        let category = if i % 2 == 0 {
            PolicyCategory::Plagiarism
        } else {
            PolicyCategory::Spam
        };
        engine.submit_case(&case(id, category)).await.unwrap();
    }

    let shutdown = CancellationToken::new();
    let config = WorkerConfig {
        concurrency: 2,
        ..WorkerConfig::default()
    };
    let (worker, handle) = QueueWorker::start(engine.clone(), config, shutdown.clone());
    for id in ids {
        worker.enqueue(InvestigationRequest::new(id)).unwrap();
    }

    let mut done = Vec::new();
    for _ in 0..500 {
        done = engine.recent_verdicts(10).await.unwrap();
        if done.len() == ids.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(done.len(), ids.len());
    assert_eq!(worker.depth(), 0);

    shutdown.cancel();
    handle.await.unwrap();
}
