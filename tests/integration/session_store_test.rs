//! Session Store Integration Tests
//!
//! Both store implementations behind the same trait:
//! - checkpoint/load round trip and idempotent upserts
//! - history ordering
//! - crash-resume from a file-backed SQLite database

use std::sync::Arc;

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use verdict_engine::services::cost::CostAccountant;
use verdict_engine::services::pipeline::FixedPipeline;
use verdict_engine::services::session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use verdict_engine::storage::Database;
use verdict_engine_core::{
    AnalysisDepth, Evidence, EvidencePayload, PipelineLimits, PolicyCategory, SessionStatus,
    Strategy, ToolKind,
};

use crate::support::{case, registry_of, ScriptedTool, Step};

fn stores() -> Vec<(&'static str, Arc<dyn SessionStore>)> {
    let db = Database::new_in_memory().expect("Failed to create in-memory test database");
    vec![
        ("memory", Arc::new(MemorySessionStore::new())),
        ("sqlite", Arc::new(SqliteSessionStore::new(&db))),
    ]
}

fn snapshot_evidence() -> Evidence {
    Evidence::new(
        ToolKind::SnapshotCapture,
        EvidencePayload::Snapshot {
            screenshot_ref: "shot-7".to_string(),
            http_status: 200,
            text_excerpt: "for sale".to_string(),
        },
        0.8,
        0.4,
        "page captured",
    )
    .with_cost(2_000)
}

#[tokio::test]
async fn test_checkpoint_round_trip_on_every_store() {
    for (name, store) in stores() {
        let mut session = store.create("s-1", Strategy::Agent).await.unwrap();
        session.advance().unwrap();
        session.record_evidence(snapshot_evidence()).unwrap();
        session.note("iteration 1: snapshot").unwrap();
        store.checkpoint(&session).await.unwrap();
        // Same iteration twice is an upsert, not a new row.
        store.checkpoint(&session).await.unwrap();

        let loaded = store.load("s-1").await.unwrap();
        assert_eq!(loaded, session, "{} store", name);

        let history = store.history("s-1").await.unwrap();
        let iterations: Vec<u32> = history.iter().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![0, 1], "{} store", name);

        assert!(store.create("s-1", Strategy::Agent).await.is_err(), "{} store", name);
        assert!(store.find("missing").await.unwrap().is_none(), "{} store", name);
    }
}

#[tokio::test]
async fn test_pipeline_resumes_after_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("verdicts.db");
    let case = case("r-1", PolicyCategory::Plagiarism);

    // First process: tier 1 ran and was checkpointed, then the process died.
    {
        let db = Database::new(Some(&path)).unwrap();
        let store = SqliteSessionStore::new(&db);
        let mut session = store.create("r-1", Strategy::FixedPipeline).await.unwrap();
        session.advance_to(1).unwrap();
        session
            .record_evidence(
                Evidence::new(
                    ToolKind::VisualSimilarityCompare,
                    EvidencePayload::VisualSimilarity {
                        similarity: 0.4,
                        reference: None,
                        matched_regions: 1,
                        code_similarity: None,
                    },
                    0.4,
                    0.4,
                    "weak match",
                )
                .with_depth(AnalysisDepth::Screen)
                .with_cost(5_000),
            )
            .unwrap();
        store.checkpoint(&session).await.unwrap();
    }

    // Second process picks up at tier 2.
    let db = Database::new(Some(&path)).unwrap();
    let store = Arc::new(SqliteSessionStore::new(&db));
    let tool = ScriptedTool::new(
        ToolKind::VisualSimilarityCompare,
        vec![Step::Succeed(0.85, 0.9)],
    );
    let pipeline = FixedPipeline::new(
        registry_of(&[tool.clone()]),
        store.clone(),
        Arc::new(CostAccountant::new()),
        PipelineLimits::default(),
    );

    let outcome = pipeline
        .run(&case, None, &CancellationToken::new())
        .await
        .unwrap();
    let verdict = outcome.verdict().expect("verdict");

    assert_eq!(tool.depths(), vec![AnalysisDepth::Targeted]);
    assert_eq!(verdict.evidence_summary.len(), 2);

    let session = store.load("r-1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Concluded);
    assert_eq!(session.iteration, 2);
    assert_eq!(
        session.cumulative_cost_micros,
        5_000 + tool.cost_at(AnalysisDepth::Targeted)
    );
    assert_eq!(store.load_verdict("r-1").await.unwrap(), Some(verdict.clone()));
}
