//! Application state and shared resources.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::hub::Hub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Role registry + live connection set
    pub hub: Arc<Hub>,

    /// Fires once on shutdown; every open WebSocket subscribes
    pub shutdown: broadcast::Sender<()>,

    /// Process start time, for uptime reporting
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state with an empty hub
    pub fn new(config: AppConfig, shutdown: broadcast::Sender<()>) -> Self {
        let hub = Arc::new(Hub::new(config.hub()));

        Self {
            config: Arc::new(config),
            hub,
            shutdown,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the relay started
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
