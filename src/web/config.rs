//! Web server configuration.

use crate::error::{ExecError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Where the metrics API listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Send permissive CORS headers
    pub enable_cors: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// `host:port`, as given.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the bind address, rejecting hosts that are not IP literals.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address()
            .parse::<SocketAddr>()
            .map_err(|e| ExecError::config_error(format!("Invalid bind address '{}': {}", self.bind_address(), e)))
    }
}
