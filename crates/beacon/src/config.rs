//! Configuration management for Beacon.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use waypoint_common::WaypointError;
use waypoint_common::constants::{
    CLIENT_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_MAX_CONNECTIONS, DEFAULT_SEND_QUEUE_CAPACITY,
    HEARTBEAT_INTERVAL_SECS,
};

use crate::hub::HubConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Maximum concurrent WebSocket connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Outbound frames buffered per connection before dropping
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,

    /// Server → client ping interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Drop a connection after this many seconds without any inbound frame
    #[serde(default = "default_client_timeout")]
    pub client_timeout_secs: u64,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_max_connections() -> usize { DEFAULT_MAX_CONNECTIONS }
fn default_send_queue_capacity() -> usize { DEFAULT_SEND_QUEUE_CAPACITY }
fn default_heartbeat_interval() -> u64 { HEARTBEAT_INTERVAL_SECS }
fn default_client_timeout() -> u64 { CLIENT_TIMEOUT_SECS }
fn default_cors_permissive() -> bool { true }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, listen_override: Option<&str>) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!(path = config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = listen_override {
            config.listen_addr = listen.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<(), WaypointError> {
        let invalid = |msg: String| -> Result<(), WaypointError> { Err(WaypointError::Config(msg)) };

        if self.max_connections == 0 {
            return invalid("max_connections must be at least 1".into());
        }
        if self.send_queue_capacity == 0 {
            return invalid("send_queue_capacity must be at least 1".into());
        }
        if self.heartbeat_interval_secs == 0 {
            return invalid("heartbeat_interval_secs must be at least 1".into());
        }
        if self.client_timeout_secs <= self.heartbeat_interval_secs {
            return invalid(format!(
                "client_timeout_secs ({}) must exceed heartbeat_interval_secs ({})",
                self.client_timeout_secs, self.heartbeat_interval_secs
            ));
        }
        Ok(())
    }

    pub fn hub(&self) -> HubConfig {
        HubConfig {
            max_connections: self.max_connections,
            send_queue_capacity: self.send_queue_capacity,
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            send_queue_capacity: default_send_queue_capacity(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            client_timeout_secs: default_client_timeout(),
            cors_permissive: default_cors_permissive(),
        }
    }
}
