//! Proxy Configuration
//!
//! Outbound proxy settings shared by every capability call.

use serde::{Deserialize, Serialize};

use crate::types::{CapabilityError, CapabilityResult};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Read from the config file but never written back.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL without credentials.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn validate(&self) -> CapabilityResult<()> {
        if self.host.trim().is_empty() {
            return Err(CapabilityError::InvalidRequest {
                message: "proxy host cannot be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(CapabilityError::InvalidRequest {
                message: "proxy port must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
