//! Scripted tools and fixtures for unit tests.

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

/// One scripted invocation.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Succeed with (confidence, severity).
    Succeed(f64, f64),
    Fail,
    /// Sleep past the tool's timeout.
    Hang,
}

/// Tool that replays a script, then repeats `fallback`.
pub struct ScriptedTool {
    kind: ToolKind,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicU32,
    depths: Mutex<Vec<AnalysisDepth>>,
    cancel_after: Option<(u32, CancellationToken)>,
}

impl ScriptedTool {
    pub fn new(kind: ToolKind, steps: Vec<Step>) -> Self {
        Self {
            kind,
            steps: Mutex::new(steps.into()),
            fallback: Step::Fail,
            calls: AtomicU32::new(0),
            depths: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    pub fn always(kind: ToolKind, step: Step) -> Self {
        Self {
            fallback: step,
            ..Self::new(kind, Vec::new())
        }
    }

    /// Cancel `token` once the `call`-th invocation returns.
    pub fn cancelling(mut self, call: u32, token: CancellationToken) -> Self {
        self.cancel_after = Some((call, token));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn depths(&self) -> Vec<AnalysisDepth> {
        self.depths.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl ToolDescriptor for ScriptedTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        ToolSettings::default_for(self.kind).cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

#[async_trait]
impl ToolExecutable for ScriptedTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut depths) = self.depths.lock() {
            depths.push(ctx.depth);
        }
        let step = self
            .steps
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(self.fallback);

        let result = match step {
            Step::Succeed(confidence, severity) => Ok(Evidence::new(
                self.kind,
                payload_for(self.kind, severity),
                confidence,
                severity,
                format!("scripted {} result", self.kind),
            )
            .with_depth(ctx.depth)
            .with_cost(self.estimated_cost(ctx.depth))),
            Step::Fail => Err(ToolError::Network(format!("scripted failure {}", call))),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ToolError::Unavailable("woke from hang".to_string()))
            }
        };

        if let Some((n, token)) = &self.cancel_after {
            if call == *n {
                token.cancel();
            }
        }
        result
    }
}

/// A payload of the right evidence kind for `kind`.
pub fn payload_for(kind: ToolKind, severity: f64) -> EvidencePayload {
    match kind {
        ToolKind::SnapshotCapture => EvidencePayload::Snapshot {
            screenshot_ref: "shot-1".to_string(),
            http_status: 200,
            text_excerpt: "listing text".to_string(),
        },
        ToolKind::SourceFetch => EvidencePayload::Source {
            content_type: "text/html".to_string(),
            bytes: 512,
            excerpt: "<html>".to_string(),
        },
        ToolKind::CodePatternExtract => EvidencePayload::CodePatterns {
            patterns: vec!["grid".to_string()],
            matches: vec![],
        },
        ToolKind::TextPolicyAnalyze => EvidencePayload::TextFindings {
            violation_score: severity,
            findings: vec!["scripted finding".to_string()],
            labels: vec![],
        },
        ToolKind::VisualSimilarityCompare => EvidencePayload::VisualSimilarity {
            similarity: severity,
            reference: None,
            matched_regions: 1,
            code_similarity: None,
        },
        ToolKind::Conclude => EvidencePayload::Conclusion {
            rationale: "scripted".to_string(),
        },
    }
}

pub fn registry_with(tools: Vec<Arc<ScriptedTool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

pub fn plagiarism_case(id: &str) -> Case {
    Case::new(
        id,
        PolicyCategory::Plagiarism,
        "https://market.example/listing/1",
        "storefront copies our theme",
    )
}

pub fn harassment_case(id: &str) -> Case {
    Case::new(
        id,
        PolicyCategory::Harassment,
        "https://market.example/listing/2",
        "seller sends threatening messages",
    )
}
