//! Services
//!
//! Business logic: routing, the two investigation strategies, cost
//! accounting, session persistence and the queue worker.

pub mod agent;
pub mod cost;
pub mod engine;
pub mod pipeline;
pub mod queue;
pub mod router;
pub mod session;

pub use agent::{HeuristicSelector, InvestigationAgent, ReasoningSelector, ToolSelector};
pub use cost::{CostAccountant, CostError};
pub use engine::{EngineError, InvestigationEngine, InvestigationOutcome};
pub use pipeline::FixedPipeline;
pub use queue::{QueueError, QueueWorker};
pub use router::{Route, TierRouter};
pub use session::{CaseStore, MemorySessionStore, SessionStore, SqliteSessionStore};
