//! Text Policy Analysis Tool
//!
//! Scores the complaint, the listing text gathered so far and any moderator
//! context against the case's policy category.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use verdict_engine_capabilities::{Capability, CapabilityTransport};
use verdict_engine_core::evidence::boundary_confidence;
use verdict_engine_core::{
    AnalysisDepth, Evidence, EvidencePayload, ToolContext, ToolDescriptor, ToolExecutable,
    ToolKind, ToolResult,
};

use super::{gathered_text, request, unit_score};
use crate::settings::ToolSettings;

#[derive(Debug, Deserialize)]
struct TextPolicyResponse {
    violation_score: f64,
    #[serde(default)]
    findings: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
    /// Classifier's own certainty; derived from the score when absent.
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct TextPolicyTool {
    transport: Arc<dyn CapabilityTransport>,
    settings: ToolSettings,
}

impl TextPolicyTool {
    pub fn new(transport: Arc<dyn CapabilityTransport>, settings: ToolSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }
}

impl ToolDescriptor for TextPolicyTool {
    fn kind(&self) -> ToolKind {
        ToolKind::TextPolicyAnalyze
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.settings.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn description(&self) -> &str {
        "Classify the complaint and listing text against the policy category"
    }
}

#[async_trait]
impl ToolExecutable for TextPolicyTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let body = json!({
            "category": ctx.case.policy_category,
            "complaint": ctx.case.complaint_text,
            "context": ctx.case.context,
            "page_text": gathered_text(&ctx),
            "depth": ctx.depth,
        });
        let resp: TextPolicyResponse =
            request(self.transport.as_ref(), Capability::TextPolicy, body).await?;

        let score = unit_score("violation_score", resp.violation_score)?;
        let confidence = match resp.confidence {
            Some(c) => unit_score("confidence", c)?,
            None => boundary_confidence(score),
        };
        let summary = if resp.findings.is_empty() {
            format!("no {} language found (score {:.2})", ctx.case.policy_category, score)
        } else {
            format!(
                "{} finding(s), score {:.2}: {}",
                resp.findings.len(),
                score,
                resp.findings.join("; ")
            )
        };

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::TextFindings {
                violation_score: score,
                findings: resp.findings,
                labels: resp.labels,
            },
            confidence,
            score,
            summary,
        )
        .with_depth(ctx.depth)
        .with_cost(self.estimated_cost(ctx.depth)))
    }
}
