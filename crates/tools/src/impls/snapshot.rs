//! Snapshot Capture Tool
//!
//! Renders the reported page, stores the screenshot and returns the page's
//! visible text plus an optional content-risk score from the renderer's
//! classifier.

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

/// Confidence of a plain capture without a risk score.
const UNSCORED_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    screenshot_ref: String,
    http_status: u16,
    #[serde(default)]
    text_excerpt: String,
    #[serde(default)]
    risk_score: Option<f64>,
}

pub struct SnapshotTool {
    transport: Arc<dyn CapabilityTransport>,
    settings: ToolSettings,
}

impl SnapshotTool {
    pub fn new(transport: Arc<dyn CapabilityTransport>, settings: ToolSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }
}

impl ToolDescriptor for SnapshotTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SnapshotCapture
    }

    fn estimated_cost(&self, depth: AnalysisDepth) -> u64 {
        self.settings.cost_at(depth)
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn description(&self) -> &str {
        "Capture a screenshot and the visible text of the reported page"
    }
}

#[async_trait]
impl ToolExecutable for SnapshotTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let body = json!({
            "url": ctx.case.target_url,
            "full_page": ctx.depth == AnalysisDepth::Deep,
        });
        let resp: SnapshotResponse =
            request(self.transport.as_ref(), Capability::Snapshot, body).await?;

        let (confidence, severity, summary) = match (resp.http_status, resp.risk_score) {
            (404 | 410, _) => (
                0.5,
                0.0,
                format!("page no longer available (HTTP {})", resp.http_status),
            ),
            (_, Some(score)) => {
                let score = unit_score("risk_score", score)?;
                (
                    boundary_confidence(score),
                    score,
                    format!("page captured, content risk {:.2}", score),
                )
            }
            (_, None) => (
                UNSCORED_CONFIDENCE,
                0.0,
                format!("page captured (HTTP {})", resp.http_status),
            ),
        };

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::Snapshot {
                screenshot_ref: resp.screenshot_ref,
                http_status: resp.http_status,
                text_excerpt: resp.text_excerpt,
            },
            confidence,
            severity,
            summary,
        )
        .with_depth(ctx.depth)
        .with_cost(self.estimated_cost(ctx.depth)))
    }
}
