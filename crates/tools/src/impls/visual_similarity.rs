//! Visual Similarity Comparison Tool
//!
//! Compares the listing's rendering against reference originals. This is the
//! fixed pipeline's classifier: `Screen` is the cheap perceptual-hash pass,
//! `Targeted` the region-level comparison, and `Deep` the full comparison
//! which also runs code-pattern analysis and merges both into one result.
//! The deep price covers both calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use verdict_engine_capabilities::{Capability, CapabilityTransport};
use verdict_engine_core::evidence::boundary_confidence;
use verdict_engine_core::{
    AnalysisDepth, Evidence, EvidencePayload, ToolContext, ToolDescriptor, ToolExecutable,
    ToolKind, ToolResult,
};

use super::code_pattern::{code_pattern_request, CodePatternResponse};
use super::{request, unit_score};
use crate::settings::ToolSettings;

#[derive(Debug, Deserialize)]
struct VisionResponse {
    similarity: f64,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    matched_regions: u32,
}

pub struct VisualSimilarityTool {
    transport: Arc<dyn CapabilityTransport>,
    settings: ToolSettings,
}

impl VisualSimilarityTool {
    pub fn new(transport: Arc<dyn CapabilityTransport>, settings: ToolSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Code-pattern similarity for the deep pass. Failures degrade to `None`.
    async fn code_similarity(&self, ctx: &ToolContext<'_>) -> Option<f64> {
        if !self.transport.is_configured(Capability::CodePattern) {
            return None;
        }
        let outcome: Result<CodePatternResponse, _> = request(
            self.transport.as_ref(),
            Capability::CodePattern,
            code_pattern_request(ctx),
        )
        .await;
        match outcome.and_then(|resp| resp.max_similarity()) {
            Ok(best) => Some(best.unwrap_or(0.0)),
            Err(e) => {
                warn!(case_id = %ctx.case.id, error = %e, "deep code-pattern pass failed");
                None
            }
        }
    }
}

impl ToolDescriptor for VisualSimilarityTool {
    fn kind(&self) -> ToolKind {
        ToolKind::VisualSimilarityCompare
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.settings.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn description(&self) -> &str {
        "Compare the listing's visuals against reference originals"
    }
}

#[async_trait]
impl ToolExecutable for VisualSimilarityTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let body = json!({
            "url": ctx.case.target_url,
            "complaint": ctx.case.complaint_text,
            "depth": ctx.depth,
        });
        let resp: VisionResponse =
            request(self.transport.as_ref(), Capability::Vision, body).await?;
        let similarity = unit_score("similarity", resp.similarity)?;

        let code_similarity = if ctx.depth == AnalysisDepth::Deep {
            self.code_similarity(&ctx).await
        } else {
            None
        };
        let merged = code_similarity.map_or(similarity, |c| c.max(similarity));

        let mut summary = format!(
            "{} visual similarity {:.2} over {} region(s)",
            ctx.depth, similarity, resp.matched_regions
        );
        if let Some(reference) = &resp.reference {
            summary.push_str(&format!(" against {}", reference));
        }
        if let Some(code) = code_similarity {
            summary.push_str(&format!(", code similarity {:.2}", code));
        }

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::VisualSimilarity {
                similarity,
                reference: resp.reference,
                matched_regions: resp.matched_regions,
                code_similarity,
            },
            boundary_confidence(merged),
            merged,
            summary,
        )
        .with_depth(ctx.depth)
        .with_cost(self.estimated_cost(ctx.depth)))
    }
}
