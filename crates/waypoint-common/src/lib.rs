//! # Waypoint Common
//!
//! Shared types, wire protocol, and utilities used across Waypoint components.
//!
//! ## Modules
//! - `types` - Core data structures (Role, ConnectionId, Coordinates, etc.)
//! - `protocol` - Client/server WebSocket events
//! - `geo` - Great-circle distance
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod geo;
pub mod protocol;
pub mod types;

pub use error::WaypointError;
pub use protocol::{ClientEvent, ServerEvent};
pub use types::*;
