//! Core types shared across Waypoint components.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WaypointError;

/// Opaque, server-assigned identifier of one live WebSocket session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Participant kind. Each role is held by at most one connection.
///
/// - `Admin`: the primary observer (the person waiting for the bus)
/// - `Bus`: the tracked unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Bus,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Bus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Bus => "bus",
        }
    }

    /// The role on the other side of the tracking session
    pub fn counterpart(&self) -> Role {
        match self {
            Self::Admin => Self::Bus,
            Self::Bus => Self::Admin,
        }
    }

    /// Human-readable label for dashboards
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin/User",
            Self::Bus => "Bus",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "bus" => Ok(Self::Bus),
            other => Err(WaypointError::Protocol(format!("unknown role `{other}`"))),
        }
    }
}

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WaypointError> {
        let coords = Self { latitude, longitude };
        coords.validate()?;
        Ok(coords)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(&self) -> Result<(), WaypointError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(WaypointError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Current mapping of roles to holding connections.
///
/// Serialized as `{"adminId": .., "busId": ..}` with `null` for a free slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignments {
    pub admin_id: Option<ConnectionId>,
    pub bus_id: Option<ConnectionId>,
}

impl RoleAssignments {
    /// Holder of the given role, if any
    pub fn holder(&self, role: Role) -> Option<&ConnectionId> {
        match role {
            Role::Admin => self.admin_id.as_ref(),
            Role::Bus => self.bus_id.as_ref(),
        }
    }

    /// Role held by the given connection, if any
    pub fn role_of(&self, id: &ConnectionId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.holder(*role) == Some(id))
    }
}
