//! WebSocket wire protocol.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.
//!
//! ```text
//! client → server   select-role       {"role": "admin" | "bus"}
//!                   send-Location     {"latitude": f64, "longitude": f64}
//! server → client   connected         {"id": "<connection id>"}
//!                   role-assignments  {"adminId": id|null, "busId": id|null}
//!                   receive-location  {"id", "latitude", "longitude", "role"}
//!                   user-disconnected "<connection id>"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::WaypointError;
use crate::types::{ConnectionId, Coordinates, Role, RoleAssignments};

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Claim a role (first come, first served)
    #[serde(rename = "select-role")]
    SelectRole { role: Role },

    /// Report the sender's current position. Any `role` field the
    /// client attaches is ignored; the relay tags from its own registry.
    #[serde(rename = "send-Location")]
    SendLocation { latitude: f64, longitude: f64 },
}

impl ClientEvent {
    pub fn location(coords: Coordinates) -> Self {
        Self::SendLocation {
            latitude: coords.latitude,
            longitude: coords.longitude,
        }
    }

    pub fn decode(text: &str) -> Result<Self, WaypointError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, WaypointError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A location update tagged with the sender's id and resolved role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEvent {
    pub id: ConnectionId,
    pub latitude: f64,
    pub longitude: f64,
    pub role: Option<Role>,
}

impl LocationEvent {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Events sent by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Greeting sent once to a new connection
    #[serde(rename = "connected")]
    Connected { id: ConnectionId },

    #[serde(rename = "role-assignments")]
    RoleAssignments(RoleAssignments),

    #[serde(rename = "receive-location")]
    ReceiveLocation(LocationEvent),

    #[serde(rename = "user-disconnected")]
    UserDisconnected(ConnectionId),
}

impl ServerEvent {
    pub fn decode(text: &str) -> Result<Self, WaypointError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, WaypointError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        use crate::constants::events;
        match self {
            Self::Connected { .. } => events::CONNECTED,
            Self::RoleAssignments(_) => events::ROLE_ASSIGNMENTS,
            Self::ReceiveLocation(_) => events::RECEIVE_LOCATION,
            Self::UserDisconnected(_) => events::USER_DISCONNECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_select_role() {
        let event = ClientEvent::decode(r#"{"event":"select-role","data":{"role":"bus"}}"#).unwrap();
        assert_eq!(event, ClientEvent::SelectRole { role: Role::Bus });
    }

    #[test]
    fn test_decode_location_ignores_client_role() {
        let text = r#"{"event":"send-Location","data":{"latitude":10,"longitude":20.5,"role":"admin"}}"#;
        let event = ClientEvent::decode(text).unwrap();
        assert_eq!(
            event,
            ClientEvent::SendLocation {
                latitude: 10.0,
                longitude: 20.5
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(ClientEvent::decode("not json").is_err());
        assert!(ClientEvent::decode(r#"{"event":"select-role","data":{"role":"driver"}}"#).is_err());
        assert!(ClientEvent::decode(r#"{"event":"teleport","data":{}}"#).is_err());
        assert!(ClientEvent::decode(r#"{"event":"send-Location","data":{"latitude":"x"}}"#).is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let location = ServerEvent::ReceiveLocation(LocationEvent {
            id: ConnectionId::from("A"),
            latitude: 10.0,
            longitude: 20.0,
            role: Some(Role::Admin),
        });
        let value: serde_json::Value = serde_json::from_str(&location.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "receive-location",
                "data": { "id": "A", "latitude": 10.0, "longitude": 20.0, "role": "admin" }
            })
        );

        let gone = ServerEvent::UserDisconnected(ConnectionId::from("A"));
        let value: serde_json::Value = serde_json::from_str(&gone.encode().unwrap()).unwrap();
        assert_eq!(value, json!({ "event": "user-disconnected", "data": "A" }));
        assert_eq!(gone.name(), "user-disconnected");
    }

    #[test]
    fn test_untagged_role_serializes_as_null() {
        let location = ServerEvent::ReceiveLocation(LocationEvent {
            id: ConnectionId::from("C"),
            latitude: 1.0,
            longitude: 2.0,
            role: None,
        });
        let value: serde_json::Value = serde_json::from_str(&location.encode().unwrap()).unwrap();
        assert_eq!(value["data"]["role"], serde_json::Value::Null);
    }
}
