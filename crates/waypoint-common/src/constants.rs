//! Shared constants for Waypoint components.

/// Default Beacon HTTP/WebSocket listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Default WebSocket URL used by clients
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/ws";

/// WebSocket upgrade path
pub const WS_PATH: &str = "/ws";

/// Maximum concurrent connections accepted by the relay
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Outbound queue depth per connection before messages are dropped
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 64;

/// Server ping interval (seconds)
pub const HEARTBEAT_INTERVAL_SECS: u64 = 20;

/// Connection is dropped after this long without any inbound frame (seconds)
pub const CLIENT_TIMEOUT_SECS: u64 = 60;

/// Mean earth radius used by the haversine formula (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Server event names, as used in logs
pub mod events {
    /// server → client: greeting carrying the receiver's own id
    pub const CONNECTED: &str = "connected";

    /// server → client: current role assignment state
    pub const ROLE_ASSIGNMENTS: &str = "role-assignments";

    /// server → client: a tagged location update
    pub const RECEIVE_LOCATION: &str = "receive-location";

    /// server → client: a connection went away
    pub const USER_DISCONNECTED: &str = "user-disconnected";
}

/// OpenRouteService endpoints
pub mod routing {
    /// Directions API base URL
    pub const ORS_BASE_URL: &str = "https://api.openrouteservice.org";

    /// Driving profile path
    pub const ORS_DRIVING_PATH: &str = "/v2/directions/driving-car";
}
