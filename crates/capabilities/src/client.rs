//! Capability Client
//!
//! The single HTTP client shared by all tools. Constructed once from
//! `CapabilityConfig` and injected; nothing reads global state.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::http_client::build_http_client;
use crate::provider::{missing_endpoint_error, parse_http_error, CapabilityTransport};
use crate::types::{Capability, CapabilityConfig, CapabilityError, CapabilityResult};

/// HTTP transport for capability services.
pub struct CapabilityClient {
    config: CapabilityConfig,
    client: reqwest::Client,
}

impl CapabilityClient {
    /// Create a client with the given configuration.
    pub fn new(config: CapabilityConfig) -> CapabilityResult<Self> {
        config.validate()?;
        let client = build_http_client(
            config.proxy.as_ref(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CapabilityConfig {
        &self.config
    }

    fn map_send_error(&self, err: reqwest::Error) -> CapabilityError {
        if err.is_timeout() {
            CapabilityError::Timeout {
                timeout_ms: self.config.request_timeout_secs * 1000,
            }
        } else {
            CapabilityError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl CapabilityTransport for CapabilityClient {
    async fn call(&self, capability: Capability, request: Value) -> CapabilityResult<Value> {
        let url = self
            .config
            .endpoint(capability)
            .ok_or_else(|| missing_endpoint_error(capability))?;

        debug!(capability = %capability, url, "capability request");

        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body_text, capability));
        }

        serde_json::from_str(&body_text).map_err(|e| CapabilityError::ParseError {
            message: format!("{} returned invalid JSON: {}", capability, e),
        })
    }

    fn is_configured(&self, capability: Capability) -> bool {
        self.config.endpoint(capability).is_some()
    }
}
