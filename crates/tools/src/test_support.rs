//! Scripted tools and transports for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use verdict_engine_capabilities::{
    Capability, CapabilityError, CapabilityResult, CapabilityTransport,
};
use verdict_engine_core::{
    AnalysisDepth, Case, Evidence, EvidencePayload, PolicyCategory, ToolContext, ToolDescriptor,
    ToolError, ToolExecutable, ToolKind, ToolResult,
};

pub fn sample_case() -> Case {
    Case::new(
        "case-42",
        PolicyCategory::Plagiarism,
        "https://market.example/listing/42",
        "this theme copies our storefront",
    )
}

/// Tool that fails a fixed number of times, then succeeds.
pub struct ScriptedTool {
    kind: ToolKind,
    failures_before_success: u32,
    confidence: f64,
    hang: Option<Duration>,
    calls: AtomicU32,
}

impl ScriptedTool {
    pub fn succeeding(kind: ToolKind, confidence: f64) -> Self {
        Self::failing_then(kind, 0, confidence)
    }

    pub fn failing_then(kind: ToolKind, failures: u32, confidence: f64) -> Self {
        Self {
            kind,
            failures_before_success: failures,
            confidence,
            hang: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Never returns; its timeout is `timeout`.
    pub fn hanging(kind: ToolKind, timeout: Duration) -> Self {
        Self {
            hang: Some(timeout),
            ..Self::succeeding(kind, 0.5)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolDescriptor for ScriptedTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn estimated_cost(&self, _depth: AnalysisDepth) -> u64 {
        100
    }

    fn timeout(&self) -> Duration {
        self.hang.unwrap_or(Duration::from_secs(5))
    }
}

#[async_trait]
impl ToolExecutable for ScriptedTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.is_some() {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if call < self.failures_before_success {
            return Err(ToolError::Network(format!("scripted failure {}", call + 1)));
        }
        Ok(Evidence::new(
            self.kind,
            EvidencePayload::Conclusion {
                rationale: "scripted".to_string(),
            },
            self.confidence,
            self.confidence,
            "scripted evidence",
        )
        .with_depth(ctx.depth))
    }
}

/// Transport that replays queued responses per capability and records requests.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<Capability, VecDeque<CapabilityResult<Value>>>>,
    requests: Mutex<Vec<(Capability, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, capability: Capability, response: Value) -> Self {
        self.push(capability, Ok(response))
    }

    pub fn fail(self, capability: Capability, error: CapabilityError) -> Self {
        self.push(capability, Err(error))
    }

    fn push(self, capability: Capability, result: CapabilityResult<Value>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(capability)
            .or_default()
            .push_back(result);
        self
    }

    pub fn requests(&self) -> Vec<(Capability, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityTransport for ScriptedTransport {
    async fn call(&self, capability: Capability, request: Value) -> CapabilityResult<Value> {
        self.requests.lock().unwrap().push((capability, request));
        self.responses
            .lock()
            .unwrap()
            .get_mut(&capability)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(CapabilityError::NotConfigured { capability }))
    }

    fn is_configured(&self, capability: Capability) -> bool {
        self.responses.lock().unwrap().contains_key(&capability)
    }
}
