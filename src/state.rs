//! Application State
//!
//! Shared state handed to every HTTP handler: configuration, the database,
//! the investigation engine and the queue worker feeding it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use verdict_engine_capabilities::{CapabilityClient, CapabilityTransport};
use verdict_engine_core::ToolRegistry;
use verdict_engine_tools::default_registry;

use crate::models::settings::{EngineConfig, SelectorMode};
use crate::services::agent::{HeuristicSelector, ReasoningSelector, ToolSelector};
use crate::services::engine::InvestigationEngine;
use crate::services::queue::QueueWorker;
use crate::services::router::TierRouter;
use crate::services::session::SqliteSessionStore;
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};

/// State shared across handlers
pub struct AppState {
    config: EngineConfig,
    database: Database,
    engine: Arc<InvestigationEngine>,
    queue: QueueWorker,
}

impl AppState {
    /// Build every service from configuration and start the queue worker.
    pub fn initialize(
        config: EngineConfig,
        shutdown: CancellationToken,
    ) -> AppResult<(Self, JoinHandle<()>)> {
        config.validate().map_err(AppError::config)?;

        let database = Database::new(config.database_path.as_deref())?;
        let client = CapabilityClient::new(config.capabilities.clone())?;
        let transport: Arc<dyn CapabilityTransport> = Arc::new(client);
        let registry = Arc::new(default_registry(transport.clone(), &config.tools));

        Self::with_registry(config, database, registry, Some(transport), shutdown)
    }

    /// Build the state around an existing tool registry. The transport is
    /// only needed when the reasoning selector is configured.
    pub fn with_registry(
        config: EngineConfig,
        database: Database,
        registry: Arc<ToolRegistry>,
        transport: Option<Arc<dyn CapabilityTransport>>,
        shutdown: CancellationToken,
    ) -> AppResult<(Self, JoinHandle<()>)> {
        for category in &config.enabled_categories {
            let missing = registry.missing_for(*category);
            if !missing.is_empty() {
                warn!(category = %category, missing = ?missing, "category is missing tools");
            }
        }
        info!(tools = registry.len(), "tool registry ready");

        let agent_limits = config.agent_limits().map_err(AppError::config)?;
        let pipeline_limits = config.pipeline_limits().map_err(AppError::config)?;

        let heuristic = HeuristicSelector::new(agent_limits.min_confidence_gain);
        let selector: Arc<dyn ToolSelector> = match (config.selector, transport) {
            (SelectorMode::Reasoning, Some(transport)) => Arc::new(
                ReasoningSelector::new(transport, heuristic)
                    .with_call_cost(config.reasoning_call_cost_micros()),
            ),
            (SelectorMode::Reasoning, None) => {
                return Err(AppError::config(
                    "reasoning selector requires a capability transport",
                ));
            }
            (SelectorMode::Heuristic, _) => Arc::new(heuristic),
        };

        let store = Arc::new(SqliteSessionStore::new(&database));
        let engine = Arc::new(InvestigationEngine::new(
            TierRouter::new(config.enabled_categories.iter().copied()),
            registry,
            store.clone(),
            store,
            selector,
            agent_limits,
            pipeline_limits,
        ));

        let (queue, handle) = QueueWorker::start(engine.clone(), config.worker.clone(), shutdown);
        Ok((
            Self {
                config,
                database,
                engine,
                queue,
            },
            handle,
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> &InvestigationEngine {
        &self.engine
    }

    pub fn queue(&self) -> &QueueWorker {
        &self.queue
    }

    pub fn is_database_healthy(&self) -> bool {
        self.database.is_healthy()
    }
}
