//! Fixed Pipeline Integration Tests
//!
//! Tiered escalation for bounded categories:
//! - A confident first tier stops the pipeline
//! - Weak tiers escalate through all three depths
//! - Budget exhaustion stops escalation early
//! - Evidence order follows tier order

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use verdict_engine::services::cost::CostAccountant;
use verdict_engine::services::pipeline::FixedPipeline;
use verdict_engine::services::session::{MemorySessionStore, SessionStore};
use verdict_engine_core::thresholds::micros_to_usd;
use verdict_engine_core::{
    AnalysisDepth, Decision, PipelineConfigBuilder, PipelineLimits, PolicyCategory,
    SessionStatus, Strategy, ToolKind,
};

use crate::support::{approx, case, registry_of, ScriptedTool, Step};

fn pipeline(
    tool: &Arc<ScriptedTool>,
    store: &Arc<MemorySessionStore>,
    limits: PipelineLimits,
) -> FixedPipeline {
    FixedPipeline::new(
        registry_of(&[tool.clone()]),
        store.clone(),
        Arc::new(CostAccountant::new()),
        limits,
    )
}

#[tokio::test]
async fn test_confident_first_tier_stops() {
    let tool = ScriptedTool::new(
        ToolKind::VisualSimilarityCompare,
        vec![Step::Succeed(0.9, 0.9)],
    );
    let store = Arc::new(MemorySessionStore::new());
    let case = case("pa-1", PolicyCategory::Plagiarism);

    let outcome = pipeline(&tool, &store, PipelineLimits::default())
        .run(&case, None, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(tool.calls(), 1);
    assert_eq!(verdict.decision, Decision::Major);
    assert!(approx(verdict.confidence, 0.9));
    assert!(!verdict.low_confidence);
    assert_eq!(verdict.strategy, Strategy::FixedPipeline);
    assert!(approx(
        verdict.cost_usd,
        micros_to_usd(tool.cost_at(AnalysisDepth::Screen))
    ));

    let session = store.load("pa-1").await.unwrap();
    assert_eq!(session.iteration, 1);
    assert_eq!(session.status, SessionStatus::Concluded);
    assert_eq!(
        session.cumulative_cost_micros,
        tool.cost_at(AnalysisDepth::Screen)
    );
}

#[tokio::test]
async fn test_weak_tiers_escalate_to_deep() {
    let tool = ScriptedTool::new(
        ToolKind::VisualSimilarityCompare,
        vec![
            Step::Succeed(0.5, 0.5),
            Step::Succeed(0.5, 0.5),
            Step::Succeed(0.6, 0.8),
        ],
    );
    let store = Arc::new(MemorySessionStore::new());
    let case = case("pb-1", PolicyCategory::Plagiarism);

    let outcome = pipeline(&tool, &store, PipelineLimits::default())
        .run(&case, None, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(
        tool.depths(),
        vec![
            AnalysisDepth::Screen,
            AnalysisDepth::Targeted,
            AnalysisDepth::Deep
        ]
    );
    assert!(approx(verdict.confidence, 0.6));
    assert_eq!(verdict.decision, Decision::Major);
    assert!(verdict.low_confidence);
    assert!(verdict.needs_human_review);
    assert_eq!(verdict.evidence_summary.len(), 3);

    let session = store.load("pb-1").await.unwrap();
    assert_eq!(session.iteration, 3);
    let depths: Vec<_> = session.evidence.iter().map(|e| e.depth).collect();
    assert_eq!(
        depths,
        vec![
            AnalysisDepth::Screen,
            AnalysisDepth::Targeted,
            AnalysisDepth::Deep
        ]
    );
    let expected: u64 = [
        AnalysisDepth::Screen,
        AnalysisDepth::Targeted,
        AnalysisDepth::Deep,
    ]
    .iter()
    .map(|d| tool.cost_at(*d))
    .sum();
    assert_eq!(session.cumulative_cost_micros, expected);
}

#[tokio::test]
async fn test_budget_stops_escalation() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Succeed(0.4, 0.3));
    let store = Arc::new(MemorySessionStore::new());
    let case = case("pc-1", PolicyCategory::Plagiarism);

    // Enough for the screen pass, not for the targeted one.
    let budget = tool.cost_at(AnalysisDepth::Screen) + 1;
    let limits = PipelineConfigBuilder::new()
        .budget_micros(budget)
        .build()
        .unwrap();

    let outcome = pipeline(&tool, &store, limits)
        .run(&case, None, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(tool.calls(), 1);
    assert!(verdict.low_confidence);
    assert!(verdict.cost_usd <= micros_to_usd(budget));

    let session = store.load("pc-1").await.unwrap();
    assert_eq!(session.iteration, 1);
    assert!(session.cumulative_cost_micros <= budget);
}

#[tokio::test]
async fn test_tier_count_never_exceeds_three() {
    let tool = ScriptedTool::always(ToolKind::VisualSimilarityCompare, Step::Fail);
    let store = Arc::new(MemorySessionStore::new());
    let case = case("pd-1", PolicyCategory::Plagiarism);

    let outcome = pipeline(&tool, &store, PipelineLimits::default())
        .run(&case, None, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    // One retry per tier.
    assert_eq!(tool.calls(), 6);
    assert_eq!(verdict.decision, Decision::None);
    assert!(verdict.low_confidence);

    let session = store.load("pd-1").await.unwrap();
    assert_eq!(session.iteration, 3);
    assert!(session.evidence.is_empty());
    assert_eq!(session.cumulative_cost_micros, 0);
}
