//! Source Fetch Tool

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

use super::{request, unit_score};
use crate::settings::ToolSettings;

/// Excerpt length requested per depth, in bytes.
fn excerpt_limit(depth: AnalysisDepth) -> usize {
    match depth {
        AnalysisDepth::Screen => 4 * 1024,
        AnalysisDepth::Targeted | AnalysisDepth::Standard => 32 * 1024,
        AnalysisDepth::Deep => 256 * 1024,
    }
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    content_type: String,
    bytes: u64,
    #[serde(default)]
    excerpt: String,
    /// Share of the markup matching known spam or scam kits.
    #[serde(default)]
    risk_score: Option<f64>,
}

pub struct SourceFetchTool {
    transport: Arc<dyn CapabilityTransport>,
    settings: ToolSettings,
}

impl SourceFetchTool {
    pub fn new(transport: Arc<dyn CapabilityTransport>, settings: ToolSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }
}

impl ToolDescriptor for SourceFetchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SourceFetch
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.settings.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn description(&self) -> &str {
        "Fetch the raw HTML and assets of the reported page"
    }
}

#[async_trait]
impl ToolExecutable for SourceFetchTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let body = json!({
            "url": ctx.case.target_url,
            "max_excerpt_bytes": excerpt_limit(ctx.depth),
        });
        let resp: SourceResponse =
            request(self.transport.as_ref(), Capability::Source, body).await?;

        let (confidence, severity) = match resp.risk_score {
            Some(score) => {
                let score = unit_score("risk_score", score)?;
                (boundary_confidence(score), score)
            }
            None => (0.1, 0.0),
        };
        let summary = format!(
            "fetched {} bytes of {}{}",
            resp.bytes,
            resp.content_type,
            resp.risk_score
                .map(|s| format!(", kit match {:.2}", s))
                .unwrap_or_default()
        );

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::Source {
                content_type: resp.content_type,
                bytes: resp.bytes,
                excerpt: resp.excerpt,
            },
            confidence,
            severity,
            summary,
        )
        .with_depth(ctx.depth)
        .with_cost(self.estimated_cost(ctx.depth)))
    }
}
