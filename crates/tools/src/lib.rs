//! Verdict Engine Tools
//!
//! Investigation tool implementations and the helpers that invoke them:
//! - `impls` - snapshot, source fetch, code patterns, text policy, visual similarity, conclude
//! - `executor` - timeout-bounded invocation with retry (`ToolInvocation`)
//! - `settings` - per-tool pricing and timeouts
//! - `registry` - `default_registry` wiring all tools to one capability transport

pub mod executor;
pub mod impls;
pub mod registry;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export core types
pub use executor::{invoke_with_retry, invoke_with_timeout, ToolInvocation};
pub use registry::default_registry;
pub use settings::{ToolCatalogSettings, ToolSettings};
