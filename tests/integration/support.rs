//! Shared helpers for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use verdict_engine_core::{
    AnalysisDepth, Case, Evidence, EvidencePayload, PolicyCategory, ToolContext, ToolDescriptor,
    ToolError, ToolExecutable, ToolKind, ToolRegistry, ToolResult,
};
use verdict_engine_tools::ToolSettings;

// ============================================================================
// Scripted tool
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// (confidence, severity)
    Succeed(f64, f64),
    Fail,
}

pub struct ScriptedTool {
    kind: ToolKind,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicU32,
    depths: Mutex<Vec<AnalysisDepth>>,
    cancel_on: Mutex<Option<(u32, CancellationToken)>>,
}

impl ScriptedTool {
    pub fn new(kind: ToolKind, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            steps: Mutex::new(steps.into()),
            fallback: Step::Fail,
            calls: AtomicU32::new(0),
            depths: Mutex::new(Vec::new()),
            cancel_on: Mutex::new(None),
        })
    }

    pub fn always(kind: ToolKind, step: Step) -> Arc<Self> {
        Arc::new(Self {
            kind,
            steps: Mutex::new(VecDeque::new()),
            fallback: step,
            calls: AtomicU32::new(0),
            depths: Mutex::new(Vec::new()),
            cancel_on: Mutex::new(None),
        })
    }

    /// Cancel `token` as the `call`-th invocation returns.
    pub fn cancel_on(&self, call: u32, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((call, token));
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn depths(&self) -> Vec<AnalysisDepth> {
        self.depths.lock().unwrap().clone()
    }

    pub fn cost_at(&self, depth: AnalysisDepth) -> u64 {
        ToolSettings::default_for(self.kind).cost_at(depth)
    }
}

impl ToolDescriptor for ScriptedTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

#[async_trait]
impl ToolExecutable for ScriptedTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.depths.lock().unwrap().push(ctx.depth);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(self.fallback);

        let result = match step {
            Step::Succeed(confidence, severity) => Ok(Evidence::new(
                self.kind,
                payload_for(self.kind, severity),
                confidence,
                severity,
                format!("{} scripted result", self.kind),
            )
            .with_depth(ctx.depth)
            .with_cost(self.cost_at(ctx.depth))),
            Step::Fail => Err(ToolError::Network(format!("connection refused ({})", call))),
        };

        if let Some((n, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if call == *n {
                token.cancel();
            }
        }
        result
    }
}

fn payload_for(kind: ToolKind, severity: f64) -> EvidencePayload {
    match kind {
        ToolKind::SnapshotCapture => EvidencePayload::Snapshot {
            screenshot_ref: "shot-1".to_string(),
            http_status: 200,
            text_excerpt: "listing".to_string(),
        },
        ToolKind::SourceFetch => EvidencePayload::Source {
            content_type: "text/html".to_string(),
            bytes: 1024,
            excerpt: "<html>".to_string(),
        },
        ToolKind::CodePatternExtract => EvidencePayload::CodePatterns {
            patterns: vec!["hero-grid".to_string()],
            matches: vec![],
        },
        ToolKind::TextPolicyAnalyze => EvidencePayload::TextFindings {
            violation_score: severity,
            findings: vec!["threatening language".to_string()],
            labels: vec![],
        },
        ToolKind::VisualSimilarityCompare => EvidencePayload::VisualSimilarity {
            similarity: severity,
            reference: None,
            matched_regions: 3,
            code_similarity: None,
        },
        ToolKind::Conclude => EvidencePayload::Conclusion {
            rationale: "done".to_string(),
        },
    }
}

pub fn registry_of(tools: &[Arc<ScriptedTool>]) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool.clone());
    }
    Arc::new(registry)
}

// ============================================================================
// Cases
// ============================================================================

pub fn case(id: &str, category: PolicyCategory) -> Case {
    Case::new(
        id,
        category,
        format!("https://market.example/listing/{}", id),
        "reported by a buyer",
    )
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
