//! Agent Integration Tests
//!
//! The adaptive loop for open-ended categories:
//! - Failing tools are retried, then abandoned; the loop keeps going
//! - Cancellation mid-investigation stops spending and leaves no verdict
//! - Iteration and budget bounds always yield a verdict

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use verdict_engine::services::agent::{HeuristicSelector, InvestigationAgent};
use verdict_engine::services::cost::CostAccountant;
use verdict_engine::services::engine::InvestigationOutcome;
use verdict_engine::services::session::{MemorySessionStore, SessionStore};
use verdict_engine_core::confidence::relevance;
use verdict_engine_core::{
    AgentConfigBuilder, AgentLimits, AnalysisDepth, EvidenceKind, PolicyCategory, SessionStatus,
    Strategy, ToolKind,
};

use crate::support::{approx, case, registry_of, ScriptedTool, Step};

fn agent(
    tools: &[Arc<ScriptedTool>],
    store: &Arc<MemorySessionStore>,
    limits: AgentLimits,
) -> InvestigationAgent {
    InvestigationAgent::new(
        registry_of(tools),
        store.clone(),
        Arc::new(CostAccountant::new()),
        Arc::new(HeuristicSelector::new(limits.min_confidence_gain)),
        limits,
    )
}

#[tokio::test]
async fn test_failing_text_analysis_is_abandoned() {
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Fail);
    let snapshot = ScriptedTool::new(
        ToolKind::SnapshotCapture,
        vec![Step::Succeed(0.95, 0.8)],
    );
    let store = Arc::new(MemorySessionStore::new());
    let case = case("ac-1", PolicyCategory::Harassment);

    let outcome = agent(
        &[text.clone(), snapshot.clone()],
        &store,
        AgentLimits::default(),
    )
    .run(&case, &CancellationToken::new())
    .await
    .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(text.calls(), 2);
    assert_eq!(snapshot.calls(), 1);

    let session = store.load("ac-1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Concluded);
    assert_eq!(session.strategy, Strategy::Agent);
    assert_eq!(session.failure_count(ToolKind::TextPolicyAnalyze), 2);
    assert_eq!(session.evidence.len(), 1);
    assert_eq!(
        session.tools_used,
        vec![
            ToolKind::TextPolicyAnalyze,
            ToolKind::SnapshotCapture,
            ToolKind::TextPolicyAnalyze
        ]
    );

    let expected = relevance(PolicyCategory::Harassment, EvidenceKind::Snapshot) * 0.95;
    assert!(approx(verdict.confidence, expected));
    assert!(verdict.low_confidence);
    assert!(verdict.needs_human_review);
    assert_eq!(verdict.evidence_summary.len(), 1);
    assert_eq!(
        verdict.cost_usd,
        verdict_engine_core::thresholds::micros_to_usd(snapshot.cost_at(AnalysisDepth::Standard))
    );
}

#[tokio::test]
async fn test_cancel_during_third_iteration() {
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.2, 0.3));
    let source = ScriptedTool::always(ToolKind::SourceFetch, Step::Succeed(0.2, 0.3));
    let snapshot = ScriptedTool::always(ToolKind::SnapshotCapture, Step::Succeed(0.2, 0.3));
    let store = Arc::new(MemorySessionStore::new());
    let case = case("ad-1", PolicyCategory::Spam);

    let cancel = CancellationToken::new();
    snapshot.cancel_on(1, cancel.clone());

    let tools = [text.clone(), source.clone(), snapshot.clone()];
    let outcome = agent(&tools, &store, AgentLimits::default())
        .run(&case, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, InvestigationOutcome::Cancelled);

    let session = store.load("ad-1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert_eq!(session.iteration, 3);
    let spent: u64 = tools
        .iter()
        .map(|t| t.cost_at(AnalysisDepth::Standard))
        .sum();
    assert_eq!(session.cumulative_cost_micros, spent);
    assert!(store.load_verdict("ad-1").await.unwrap().is_none());

    // Redelivery neither spends nor produces a verdict.
    let outcome = agent(&tools, &store, AgentLimits::default())
        .run(&case, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, InvestigationOutcome::Cancelled);
    assert_eq!(text.calls() + source.calls() + snapshot.calls(), 3);
    assert_eq!(
        store.load("ad-1").await.unwrap().cumulative_cost_micros,
        spent
    );
}

#[tokio::test]
async fn test_iteration_bound_yields_inconclusive_verdict() {
    // Every tool fails, so gaps stay open until each has failed out.
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Fail);
    let source = ScriptedTool::always(ToolKind::SourceFetch, Step::Fail);
    let snapshot = ScriptedTool::always(ToolKind::SnapshotCapture, Step::Fail);
    let store = Arc::new(MemorySessionStore::new());
    let case = case("ai-1", PolicyCategory::Spam);

    let limits = AgentConfigBuilder::new().max_iterations(4).build().unwrap();
    let outcome = agent(&[text, source, snapshot], &store, limits)
        .run(&case, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(verdict.status, SessionStatus::Inconclusive);
    assert!(verdict.needs_human_review);
    assert_eq!(verdict.confidence, 0.0);

    let session = store.load("ai-1").await.unwrap();
    assert_eq!(session.iteration, 4);
    assert_eq!(session.tools_used.len(), 4);
}

#[tokio::test]
async fn test_budget_bound_concludes_without_overspending() {
    let text = ScriptedTool::always(ToolKind::TextPolicyAnalyze, Step::Succeed(0.3, 0.5));
    let snapshot = ScriptedTool::always(ToolKind::SnapshotCapture, Step::Succeed(0.3, 0.5));
    let store = Arc::new(MemorySessionStore::new());
    let case = case("ab-1", PolicyCategory::HateSpeech);

    // Covers the first text pass only.
    let budget = text.cost_at(AnalysisDepth::Standard) + 1;
    let limits = AgentConfigBuilder::new()
        .budget_micros(budget)
        .build()
        .unwrap();
    let outcome = agent(&[text.clone(), snapshot.clone()], &store, limits)
        .run(&case, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(text.calls(), 1);
    assert_eq!(snapshot.calls(), 0);
    assert_eq!(verdict.status, SessionStatus::Concluded);
    assert!(verdict.low_confidence);

    let session = store.load("ab-1").await.unwrap();
    assert!(session.cumulative_cost_micros <= budget);
    assert!(session
        .reasoning
        .iter()
        .any(|line| line.contains("budget stop")));
}
