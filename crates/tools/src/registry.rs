//! Default Tool Registry
//!
//! Wires every tool implementation to one injected capability transport.

use std::sync::Arc;

use verdict_engine_capabilities::CapabilityTransport;
use verdict_engine_core::{ToolKind, ToolRegistry};

use crate::impls::{
    CodePatternTool, ConcludeTool, SnapshotTool, SourceFetchTool, TextPolicyTool,
    VisualSimilarityTool,
};
use crate::settings::ToolCatalogSettings;

/// Build a registry holding all six tools.
pub fn default_registry(
    transport: Arc<dyn CapabilityTransport>,
    settings: &ToolCatalogSettings,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SnapshotTool::new(
        transport.clone(),
        settings.get(ToolKind::SnapshotCapture),
    )));
    registry.register(Arc::new(SourceFetchTool::new(
        transport.clone(),
        settings.get(ToolKind::SourceFetch),
    )));
    registry.register(Arc::new(CodePatternTool::new(
        transport.clone(),
        settings.get(ToolKind::CodePatternExtract),
    )));
    registry.register(Arc::new(TextPolicyTool::new(
        transport.clone(),
        settings.get(ToolKind::TextPolicyAnalyze),
    )));
    registry.register(Arc::new(VisualSimilarityTool::new(
        transport,
        settings.get(ToolKind::VisualSimilarityCompare),
    )));
    registry.register(Arc::new(ConcludeTool::new()));
    registry
}
