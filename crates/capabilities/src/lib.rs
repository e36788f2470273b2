//! Verdict Engine Capabilities
//!
//! Transport for the external capability services the investigation tools
//! depend on:
//! - Page snapshotting
//! - Source fetching
//! - Code-pattern extraction
//! - Text policy analysis
//! - Vision similarity
//! - Reasoning (tool selection)
//!
//! Also includes the HTTP client factory and proxy configuration.

pub mod client;
pub mod http_client;
pub mod provider;
pub mod proxy;
pub mod types;

// Re-export main types
pub use client::CapabilityClient;
pub use http_client::build_http_client;
pub use provider::{parse_http_error, CapabilityTransport};
pub use proxy::{ProxyConfig, ProxyProtocol};
pub use types::*;
