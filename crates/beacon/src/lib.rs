//! # Beacon - Waypoint Location Relay
//!
//! Assigns the two singleton roles (`admin`, `bus`) to live WebSocket
//! connections and fans every location update out to all of them.
//!
//! ## Architecture
//! ```text
//! rider (admin) ─┐                    ┌─ role-assignments
//! rider (bus)   ─┼─ /ws ─> Hub ──────>┼─ receive-location
//! browser       ─┘   RoleRegistry     └─ user-disconnected
//! ```

pub mod config;
pub mod hub;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use hub::{Hub, HubConfig};
pub use state::AppState;
