//! Capability Types
//!
//! Capability identifiers, endpoint configuration and the capability error
//! taxonomy.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdict_engine_core::ToolError;

use crate::proxy::ProxyConfig;

/// External capability services reached over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Snapshot,
    Source,
    CodePattern,
    TextPolicy,
    Vision,
    Reasoning,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Snapshot,
        Capability::Source,
        Capability::CodePattern,
        Capability::TextPolicy,
        Capability::Vision,
        Capability::Reasoning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Snapshot => "snapshot",
            Capability::Source => "source",
            Capability::CodePattern => "code_pattern",
            Capability::TextPolicy => "text_policy",
            Capability::Vision => "vision",
            Capability::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for all capability services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Full endpoint URL per capability. Missing entries are unconfigured.
    #[serde(default)]
    pub endpoints: BTreeMap<Capability, String>,
    /// Bearer token sent to every service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Transport-level timeout; tools apply their own tighter bound.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            api_key: None,
            proxy: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CapabilityConfig {
    pub fn with_endpoint(mut self, capability: Capability, url: impl Into<String>) -> Self {
        self.endpoints.insert(capability, url.into());
        self
    }

    pub fn endpoint(&self, capability: Capability) -> Option<&str> {
        self.endpoints.get(&capability).map(String::as_str)
    }

    /// Check every configured endpoint parses as an http(s) URL.
    pub fn validate(&self) -> CapabilityResult<()> {
        for (capability, raw) in &self.endpoints {
            let parsed = url::Url::parse(raw).map_err(|e| CapabilityError::InvalidRequest {
                message: format!("{} endpoint '{}' is not a valid URL: {}", capability, raw, e),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(CapabilityError::InvalidRequest {
                    message: format!("{} endpoint must use http(s): {}", capability, raw),
                });
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(CapabilityError::InvalidRequest {
                message: "request_timeout_secs must be > 0".to_string(),
            });
        }
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }
        Ok(())
    }
}

/// Errors from capability calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { message: String, status: u16 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Capability not configured: {capability}")]
    NotConfigured { capability: Capability },

    #[error("HTTP {status}: {message}")]
    Other { message: String, status: u16 },
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

impl From<CapabilityError> for ToolError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::AuthenticationFailed { message } => ToolError::Service {
                status: 401,
                message,
            },
            CapabilityError::RateLimited { message } => ToolError::Service {
                status: 429,
                message,
            },
            CapabilityError::InvalidRequest { message } => ToolError::Service {
                status: 400,
                message,
            },
            CapabilityError::ServerError { message, status }
            | CapabilityError::Other { message, status } => ToolError::Service { status, message },
            CapabilityError::NetworkError { message } => ToolError::Network(message),
            CapabilityError::Timeout { timeout_ms } => ToolError::Timeout {
                tool: "transport".to_string(),
                timeout_ms,
            },
            CapabilityError::ParseError { message } => ToolError::MalformedResponse(message),
            CapabilityError::NotConfigured { capability } => {
                ToolError::Unavailable(format!("{} capability not configured", capability))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: CapabilityConfig = serde_json::from_str("{}").unwrap();
        assert!(config.endpoints.is_empty());
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_endpoint_keys_are_snake_case() {
        let json = r#"{"endpoints": {"text_policy": "https://text.internal/analyze"}}"#;
        let config: CapabilityConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.endpoint(Capability::TextPolicy),
            Some("https://text.internal/analyze")
        );
        assert_eq!(config.endpoint(Capability::Vision), None);
    }

    #[test]
    fn test_config_validate_rejects_bad_urls() {
        let config = CapabilityConfig::default().with_endpoint(Capability::Vision, "not a url");
        assert!(config.validate().is_err());

        let config =
            CapabilityConfig::default().with_endpoint(Capability::Vision, "ftp://vision.internal");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_error_maps_to_tool_error() {
        let err: ToolError = CapabilityError::NetworkError {
            message: "reset".to_string(),
        }
        .into();
        assert_eq!(err, ToolError::Network("reset".to_string()));

        let err: ToolError = CapabilityError::ParseError {
            message: "eof".to_string(),
        }
        .into();
        assert!(matches!(err, ToolError::MalformedResponse(_)));

        let err: ToolError = CapabilityError::ServerError {
            message: "boom".to_string(),
            status: 503,
        }
        .into();
        assert!(matches!(err, ToolError::Service { status: 503, .. }));

        let err: ToolError = CapabilityError::NotConfigured {
            capability: Capability::Snapshot,
        }
        .into();
        assert!(matches!(err, ToolError::Unavailable(_)));
    }
}
