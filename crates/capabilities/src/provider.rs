//! Capability Transport Trait
//!
//! Defines the common interface tools use to reach a capability service.
//! `CapabilityClient` is the HTTP implementation; tests substitute scripted
//! transports.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{Capability, CapabilityError, CapabilityResult};

/// Trait that all capability transports must implement.
#[async_trait]
pub trait CapabilityTransport: Send + Sync {
    /// Send one JSON request to a capability and return its JSON response.
    async fn call(&self, capability: Capability, request: Value) -> CapabilityResult<Value>;

    /// Whether the capability has an endpoint at all.
    fn is_configured(&self, capability: Capability) -> bool;
}

/// Helper function to create an error for a capability without an endpoint
pub fn missing_endpoint_error(capability: Capability) -> CapabilityError {
    CapabilityError::NotConfigured { capability }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, capability: Capability) -> CapabilityError {
    match status {
        401 => CapabilityError::AuthenticationFailed {
            message: format!("{}: Invalid API key", capability),
        },
        403 => CapabilityError::AuthenticationFailed {
            message: format!("{}: Access denied", capability),
        },
        429 => CapabilityError::RateLimited {
            message: body.to_string(),
        },
        400 | 422 => CapabilityError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => CapabilityError::ServerError {
            message: body.to_string(),
            status,
        },
        _ => CapabilityError::Other {
            message: body.to_string(),
            status,
        },
    }
}
