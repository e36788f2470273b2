//! Tool Implementations
//!
//! One module per tool. Each holds the injected capability transport and its
//! pricing, builds a request from the case and prior evidence, and maps the
//! service response into one `Evidence` item.

pub mod code_pattern;
pub mod conclude;
pub mod snapshot;
pub mod source_fetch;
pub mod text_policy;
pub mod visual_similarity;

pub use code_pattern::CodePatternTool;
pub use conclude::ConcludeTool;
pub use snapshot::SnapshotTool;
pub use source_fetch::SourceFetchTool;
pub use text_policy::TextPolicyTool;
pub use visual_similarity::VisualSimilarityTool;

use serde::de::DeserializeOwned;
use serde_json::Value;
use verdict_engine_capabilities::{Capability, CapabilityTransport};
use verdict_engine_core::{EvidenceKind, EvidencePayload, ToolContext, ToolError};

/// Call a capability and decode its response.
pub(crate) async fn request<T: DeserializeOwned>(
    transport: &dyn CapabilityTransport,
    capability: Capability,
    body: Value,
) -> Result<T, ToolError> {
    let value = transport.call(capability, body).await?;
    serde_json::from_value(value)
        .map_err(|e| ToolError::malformed(format!("{} response: {}", capability, e)))
}

/// Reject scores outside 0..=1 instead of silently clamping them.
pub(crate) fn unit_score(field: &str, value: f64) -> Result<f64, ToolError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ToolError::malformed(format!(
            "{} must be within 0..=1, got {}",
            field, value
        )));
    }
    Ok(value)
}

/// Page text gathered so far: the latest snapshot excerpt and source excerpt.
pub(crate) fn gathered_text(ctx: &ToolContext<'_>) -> Vec<String> {
    let mut text = Vec::new();
    if let Some(ev) = ctx.latest(EvidenceKind::Snapshot) {
        if let EvidencePayload::Snapshot { text_excerpt, .. } = &ev.payload {
            if !text_excerpt.is_empty() {
                text.push(text_excerpt.clone());
            }
        }
    }
    if let Some(ev) = ctx.latest(EvidenceKind::Source) {
        if let EvidencePayload::Source { excerpt, .. } = &ev.payload {
            if !excerpt.is_empty() {
                text.push(excerpt.clone());
            }
        }
    }
    text
}
