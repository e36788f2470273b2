//! Code Pattern Extraction Tool
//!
//! Extracts structural code patterns (theme templates, scripts, component
//! trees) from the listing and matches them against the reference corpus.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use verdict_engine_capabilities::{Capability, CapabilityTransport};
use verdict_engine_core::evidence::boundary_confidence;
use verdict_engine_core::{
    AnalysisDepth, Evidence, EvidenceKind, EvidencePayload, PatternMatch, ToolContext,
    ToolDescriptor, ToolError, ToolExecutable, ToolKind, ToolResult,
};

use super::{request, unit_score};
use crate::settings::ToolSettings;

/// Confidence that nothing matches when the service found patterns but no hits.
const NO_MATCH_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
pub(crate) struct CodePatternResponse {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub matches: Vec<PatternMatch>,
}

impl CodePatternResponse {
    /// Highest match similarity, validated.
    pub(crate) fn max_similarity(&self) -> Result<Option<f64>, ToolError> {
        let mut best: Option<f64> = None;
        for m in &self.matches {
            let s = unit_score("match similarity", m.similarity)?;
            best = Some(best.map_or(s, |b| b.max(s)));
        }
        Ok(best)
    }
}

/// Request body shared with the deep visual comparison.
pub(crate) fn code_pattern_request(ctx: &ToolContext<'_>) -> serde_json::Value {
    let source_excerpt = ctx.latest(EvidenceKind::Source).and_then(|ev| match &ev.payload {
        EvidencePayload::Source { excerpt, .. } if !excerpt.is_empty() => Some(excerpt.clone()),
        _ => None,
    });
    json!({
        "url": ctx.case.target_url,
        "source_excerpt": source_excerpt,
        "depth": ctx.depth,
    })
}

pub struct CodePatternTool {
    transport: Arc<dyn CapabilityTransport>,
    settings: ToolSettings,
}

impl CodePatternTool {
    pub fn new(transport: Arc<dyn CapabilityTransport>, settings: ToolSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }
}

impl ToolDescriptor for CodePatternTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CodePatternExtract
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.settings.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn description(&self) -> &str {
        "Extract code patterns from the listing and match them against known originals"
    }
}

#[async_trait]
impl ToolExecutable for CodePatternTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let resp: CodePatternResponse = request(
            self.transport.as_ref(),
            Capability::CodePattern,
            code_pattern_request(&ctx),
        )
        .await?;

        let (confidence, severity, summary) = match resp.max_similarity()? {
            Some(best) => (
                boundary_confidence(best),
                best,
                format!(
                    "{} of {} patterns match references, best {:.2}",
                    resp.matches.len(),
                    resp.patterns.len(),
                    best
                ),
            ),
            None => (
                NO_MATCH_CONFIDENCE,
                0.0,
                format!("{} patterns extracted, no reference matches", resp.patterns.len()),
            ),
        };

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::CodePatterns {
                patterns: resp.patterns,
                matches: resp.matches,
            },
            confidence,
            severity,
            summary,
        )
        .with_depth(ctx.depth)
        .with_cost(self.estimated_cost(ctx.depth)))
    }
}
