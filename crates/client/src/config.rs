// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection configuration.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! endpoint = "wss://chat.example.com/ws"
//! heartbeat_interval_ms = 30000
//! reconnect_max_attempts = 5
//! ```
//!
//! Every field except `endpoint` has a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::heartbeat::HeartbeatMonitor;
use crate::queue::OutboundQueue;
use crate::reconnect::{Backoff, ReconnectScheduler};

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint (`ws://` or `wss://`). The auth token is appended
    /// as a query parameter at connect time.
    pub endpoint: String,
    /// Query parameter that carries the auth token (default: "token").
    #[serde(default = "default_token_param")]
    pub token_param: String,
    /// Heartbeat probe interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Max time to wait for a pong in milliseconds (default: 5000).
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// First reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    /// Upper bound on the reconnect delay in milliseconds (default: 30000).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Reconnect attempts before giving up (default: 5). 0 = unlimited.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
    /// Maximum queued outbound messages; the oldest is dropped on overflow.
    /// Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    /// Queued messages older than this many milliseconds are dropped
    /// instead of sent. Never expire when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_max_age_ms: Option<u64>,
}

fn default_token_param() -> String {
    "token".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    5_000
}

fn default_reconnect_initial_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_reconnect_max_attempts() -> u32 {
    5
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig::new("ws://localhost:5001/ws")
    }
}

impl RealtimeConfig {
    /// Create a configuration for `endpoint` with every other field at its default.
    pub fn new(endpoint: impl Into<String>) -> Self {
        RealtimeConfig {
            endpoint: endpoint.into(),
            token_param: default_token_param(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            queue_capacity: None,
            queue_max_age_ms: None,
        }
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RealtimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;

        if self.token_param.is_empty() {
            return Err(ConfigError::Invalid("token_param must not be empty".into()));
        }
        if self.heartbeat_interval_ms > 0 && self.heartbeat_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_timeout_ms must be positive when heartbeats are enabled".into(),
            ));
        }
        if self.reconnect_initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "reconnect_initial_delay_ms must be positive".into(),
            ));
        }
        if self.reconnect_max_delay_ms < self.reconnect_initial_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "reconnect_max_delay_ms ({}) is below reconnect_initial_delay_ms ({})",
                self.reconnect_max_delay_ms, self.reconnect_initial_delay_ms
            )));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::Invalid("queue_capacity must be positive".into()));
        }
        Ok(())
    }

    fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(invalid(format!("scheme must be ws or wss, got '{}'", other))),
        }
    }

    /// The connection target for `token`.
    ///
    /// The result contains the token, never log it.
    pub fn connection_url(&self, token: &str) -> Result<String, ConfigError> {
        let mut url = self.endpoint_url()?;
        url.query_pairs_mut().append_pair(&self.token_param, token);
        Ok(url.into())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn queue_max_age(&self) -> Option<Duration> {
        self.queue_max_age_ms.map(Duration::from_millis)
    }

    pub(crate) fn heartbeat_monitor(&self) -> HeartbeatMonitor {
        HeartbeatMonitor::new(self.heartbeat_interval(), self.heartbeat_timeout())
    }

    pub(crate) fn reconnect_scheduler(&self) -> ReconnectScheduler {
        let backoff = Backoff::new(
            Duration::from_millis(self.reconnect_initial_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
        );
        ReconnectScheduler::new(backoff, self.reconnect_max_attempts)
    }

    pub(crate) fn outbound_queue(&self) -> OutboundQueue {
        OutboundQueue::with_limits(self.queue_capacity, self.queue_max_age())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
