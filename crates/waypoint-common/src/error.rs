//! Common error types for Waypoint components.

use thiserror::Error;

/// Common errors across Waypoint components
#[derive(Debug, Error)]
pub enum WaypointError {
    /// Malformed or unknown wire message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Latitude/longitude out of range or not finite
    #[error("Invalid coordinates: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Event from a connection the relay does not know
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Routing API failure
    #[error("Routing error: {0}")]
    Routing(String),
}

impl WaypointError {
    /// Returns true if the offending input should simply be dropped
    /// rather than tearing down the connection.
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::InvalidCoordinates { .. } | Self::UnknownConnection(_)
        )
    }
}

impl From<serde_json::Error> for WaypointError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
