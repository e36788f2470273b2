//! Settings Models
//!
//! Engine configuration stored in config.json.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use verdict_engine_capabilities::CapabilityConfig;
use verdict_engine_core::thresholds::{
    micros_to_usd, usd_to_micros, DEFAULT_MAX_ITERATIONS, DEFAULT_REASONING_CALL_COST_MICROS,
};
use verdict_engine_core::{
    AgentConfigBuilder, AgentLimits, PipelineConfigBuilder, PipelineLimits, PolicyCategory,
};
use verdict_engine_tools::ToolCatalogSettings;

/// How the agent picks its next tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectorMode {
    /// Deterministic gap-filling heuristic.
    #[default]
    Heuristic,
    /// Ask the reasoning capability, falling back to the heuristic.
    Reasoning,
}

/// HTTP status API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Queue worker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// Cases investigated at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pending envelopes before `enqueue` pushes back.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Deliveries per envelope, first attempt included.
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_concurrency() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    256
}
fn default_max_deliveries() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            max_deliveries: default_max_deliveries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Engine configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-case spend ceiling in US dollars
    #[serde(default = "default_budget_usd")]
    pub budget_usd: f64,
    /// Agent iteration bound
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Categories the router accepts; anything else is unsupported
    #[serde(default = "default_enabled_categories")]
    pub enabled_categories: Vec<PolicyCategory>,
    #[serde(default)]
    pub selector: SelectorMode,
    /// Charged to the case budget for each reasoning selector call
    #[serde(default = "default_reasoning_call_cost_usd")]
    pub reasoning_call_cost_usd: f64,
    #[serde(default)]
    pub capabilities: CapabilityConfig,
    /// Per-tool pricing and timeouts
    #[serde(default)]
    pub tools: ToolCatalogSettings,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Overrides ~/.verdict-engine/verdicts.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

fn default_budget_usd() -> f64 {
    0.5
}
fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_reasoning_call_cost_usd() -> f64 {
    micros_to_usd(DEFAULT_REASONING_CALL_COST_MICROS)
}
fn default_enabled_categories() -> Vec<PolicyCategory> {
    PolicyCategory::ALL.to_vec()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget_usd: default_budget_usd(),
            max_iterations: default_max_iterations(),
            enabled_categories: default_enabled_categories(),
            selector: SelectorMode::default(),
            reasoning_call_cost_usd: default_reasoning_call_cost_usd(),
            capabilities: CapabilityConfig::default(),
            tools: ToolCatalogSettings::default(),
            server: ServerConfig::default(),
            worker: WorkerConfig::default(),
            database_path: None,
        }
    }
}

impl EngineConfig {
    pub fn budget_micros(&self) -> u64 {
        usd_to_micros(self.budget_usd)
    }

    pub fn reasoning_call_cost_micros(&self) -> u64 {
        usd_to_micros(self.reasoning_call_cost_usd)
    }

    /// Validated agent limits.
    pub fn agent_limits(&self) -> Result<AgentLimits, String> {
        AgentConfigBuilder::new()
            .max_iterations(self.max_iterations)
            .budget_micros(self.budget_micros())
            .build()
            .map_err(String::from)
    }

    /// Validated pipeline limits.
    pub fn pipeline_limits(&self) -> Result<PipelineLimits, String> {
        PipelineConfigBuilder::new()
            .budget_micros(self.budget_micros())
            .build()
            .map_err(String::from)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.budget_usd.is_finite() || self.budget_usd <= 0.0 {
            return Err(format!("budget_usd must be positive. Got: {}", self.budget_usd));
        }
        if !self.reasoning_call_cost_usd.is_finite() || self.reasoning_call_cost_usd < 0.0 {
            return Err(format!(
                "reasoning_call_cost_usd cannot be negative. Got: {}",
                self.reasoning_call_cost_usd
            ));
        }
        self.agent_limits()?;
        self.pipeline_limits()?;

        if self.enabled_categories.is_empty() {
            return Err("enabled_categories cannot be empty".to_string());
        }

        self.capabilities.validate().map_err(|e| e.to_string())?;
        self.tools.validate().map_err(String::from)?;

        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server.bind_addr '{}': {}", self.server.bind_addr, e))?;

        if self.worker.concurrency == 0 {
            return Err("worker.concurrency must be at least 1".to_string());
        }
        if self.worker.queue_capacity == 0 {
            return Err("worker.queue_capacity must be at least 1".to_string());
        }
        if self.worker.max_deliveries == 0 {
            return Err("worker.max_deliveries must be at least 1".to_string());
        }
        if self.worker.initial_backoff_ms > self.worker.max_backoff_ms {
            return Err("worker.initial_backoff_ms cannot exceed max_backoff_ms".to_string());
        }

        Ok(())
    }
}
