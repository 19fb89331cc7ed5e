//! Broadcast Relay: the live connection set plus fan-out.
//!
//! The hub owns the [`RoleRegistry`] and every peer's outbound queue behind
//! one mutex. Each operation (claim a role, relay a location, drop a
//! connection) runs start to finish inside that lock, including its
//! fan-out, so every peer observes the same global order of events.
//!
//! Fan-out is best effort: frames are pushed with `try_send`, and a peer
//! whose queue is full or closed simply misses that frame.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use waypoint_common::protocol::LocationEvent;
use waypoint_common::{ConnectionId, Coordinates, Role, RoleAssignments, ServerEvent, WaypointError};

use crate::registry::RoleRegistry;

/// An encoded server frame, shared by every recipient of a broadcast
pub type Frame = Arc<str>;

/// Hub sizing
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Maximum number of live connections
    pub max_connections: usize,
    /// Outbound queue depth per connection
    pub send_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: waypoint_common::constants::DEFAULT_MAX_CONNECTIONS,
            send_queue_capacity: waypoint_common::constants::DEFAULT_SEND_QUEUE_CAPACITY,
        }
    }
}

#[derive(Default)]
struct HubInner {
    peers: HashMap<ConnectionId, mpsc::Sender<Frame>>,
    registry: RoleRegistry,
}

impl HubInner {
    /// Push an event to every live peer. Returns how many accepted it.
    fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        self.peers
            .iter()
            .filter(|(id, tx)| push(id, tx, &frame))
            .count()
    }
}

/// Connection registry and broadcast relay
pub struct Hub {
    config: HubConfig,
    inner: Mutex<HubInner>,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(HubInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        // Every operation mutates before it fans out, so a poisoned lock
        // still guards consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection.
    ///
    /// The new peer's queue is seeded with a `connected` greeting carrying
    /// its own id and a snapshot of the current role assignments. Returns
    /// `None` when the hub is at capacity.
    pub fn connect(&self) -> Option<(ConnectionId, mpsc::Receiver<Frame>)> {
        let mut inner = self.lock();

        if inner.peers.len() >= self.config.max_connections {
            tracing::warn!(
                max_connections = self.config.max_connections,
                "Connection limit reached, refusing peer"
            );
            return None;
        }

        let mut id = generate_connection_id();
        while inner.peers.contains_key(&id) {
            id = generate_connection_id();
        }

        // Room for the two greeting frames even with a tiny configured queue
        let (tx, rx) = mpsc::channel(self.config.send_queue_capacity.max(2));

        let greeting = [
            ServerEvent::Connected { id: id.clone() },
            ServerEvent::RoleAssignments(inner.registry.assignments()),
        ];
        for event in &greeting {
            if let Some(frame) = encode(event) {
                push(&id, &tx, &frame);
            }
        }

        inner.peers.insert(id.clone(), tx);
        tracing::info!(
            connection_id = %id,
            connections = inner.peers.len(),
            "Peer connected"
        );

        Some((id, rx))
    }

    /// Claim a role, then broadcast the resulting assignment state to all
    /// peers whether or not the claim succeeded.
    ///
    /// Returns `true` if the role was assigned.
    pub fn select_role(&self, id: &ConnectionId, role: Role) -> Result<bool, WaypointError> {
        let mut inner = self.lock();

        if !inner.peers.contains_key(id) {
            return Err(WaypointError::UnknownConnection(id.to_string()));
        }

        let assigned = inner.registry.select(id, role);
        let assignments = inner.registry.assignments();

        if assigned {
            tracing::info!(connection_id = %id, role = %role, "Role assigned");
        } else {
            tracing::info!(connection_id = %id, role = %role, "Role request ignored");
        }

        let delivered = inner.broadcast(&ServerEvent::RoleAssignments(assignments));
        tracing::debug!(delivered, "Broadcast role assignments");

        Ok(assigned)
    }

    /// Tag a location update with the sender's role and fan it out to every
    /// peer, sender included.
    ///
    /// Returns the number of peers the update was queued for.
    pub fn on_location(
        &self,
        id: &ConnectionId,
        latitude: f64,
        longitude: f64,
    ) -> Result<usize, WaypointError> {
        let coords = Coordinates::new(latitude, longitude)?;
        let inner = self.lock();

        if !inner.peers.contains_key(id) {
            return Err(WaypointError::UnknownConnection(id.to_string()));
        }

        let event = LocationEvent {
            id: id.clone(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            role: inner.registry.resolve(id),
        };

        tracing::trace!(
            connection_id = %id,
            role = ?event.role,
            latitude = coords.latitude,
            longitude = coords.longitude,
            "Relaying location"
        );

        Ok(inner.broadcast(&ServerEvent::ReceiveLocation(event)))
    }

    /// Drop a connection.
    ///
    /// Within one critical section: remove the peer, release its role,
    /// broadcast the updated assignments, then announce the departure to the
    /// remaining peers. Returns `false` if the connection was already gone.
    pub fn on_disconnect(&self, id: &ConnectionId) -> bool {
        let mut inner = self.lock();

        if inner.peers.remove(id).is_none() {
            return false;
        }

        let released = inner.registry.release(id);
        let assignments = inner.registry.assignments();

        inner.broadcast(&ServerEvent::RoleAssignments(assignments));
        inner.broadcast(&ServerEvent::UserDisconnected(id.clone()));

        tracing::info!(
            connection_id = %id,
            released = ?released,
            connections = inner.peers.len(),
            "Peer disconnected"
        );

        true
    }

    /// Role currently held by `id`. Unknown connections hold none.
    pub fn resolve(&self, id: &ConnectionId) -> Option<Role> {
        self.lock().registry.resolve(id)
    }

    /// Snapshot of the current role assignment state
    pub fn assignments(&self) -> RoleAssignments {
        self.lock().registry.assignments()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().peers.len()
    }

    pub fn is_full(&self) -> bool {
        self.connection_count() >= self.config.max_connections
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

fn encode(event: &ServerEvent) -> Option<Frame> {
    match event.encode() {
        Ok(text) => Some(Frame::from(text)),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Queue a frame for one peer without blocking
fn push(id: &ConnectionId, tx: &mpsc::Sender<Frame>, frame: &Frame) -> bool {
    match tx.try_send(Arc::clone(frame)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(connection_id = %id, "Send queue full, dropping frame");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(connection_id = %id, "Peer queue closed, dropping frame");
            false
        }
    }
}

/// Generate a random, URL-safe connection id
fn generate_connection_id() -> ConnectionId {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::Rng;

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    ConnectionId::new(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drain everything currently queued for a peer
    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            events.push(ServerEvent::decode(&frame).unwrap());
        }
        events
    }

    fn assignments(admin: Option<&ConnectionId>, bus: Option<&ConnectionId>) -> ServerEvent {
        ServerEvent::RoleAssignments(RoleAssignments {
            admin_id: admin.cloned(),
            bus_id: bus.cloned(),
        })
    }

    #[test]
    fn test_connect_sends_greeting() {
        let hub = Hub::default();
        let (id, mut rx) = hub.connect().unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::Connected { id: id.clone() }, assignments(None, None)]
        );
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let hub = Hub::default();
        let mut seen = std::collections::HashSet::new();
        let mut receivers = Vec::new();
        for _ in 0..100 {
            let (id, rx) = hub.connect().unwrap();
            assert_eq!(id.as_str().len(), 22);
            assert!(seen.insert(id));
            receivers.push(rx);
        }
    }

    #[test]
    fn test_role_selection_scenario() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        assert!(hub.select_role(&a, Role::Admin).unwrap());
        assert_eq!(drain(&mut rx_a), vec![assignments(Some(&a), None)]);
        assert_eq!(drain(&mut rx_b), vec![assignments(Some(&a), None)]);

        // Rejected claim is silent but still re-broadcasts the unchanged state
        assert!(!hub.select_role(&b, Role::Admin).unwrap());
        assert_eq!(drain(&mut rx_a), vec![assignments(Some(&a), None)]);
        assert_eq!(drain(&mut rx_b), vec![assignments(Some(&a), None)]);

        assert!(hub.select_role(&b, Role::Bus).unwrap());
        assert_eq!(drain(&mut rx_a), vec![assignments(Some(&a), Some(&b))]);
        assert_eq!(drain(&mut rx_b), vec![assignments(Some(&a), Some(&b))]);
    }

    #[test]
    fn test_location_is_tagged_and_sent_to_everyone() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        let (c, mut rx_c) = hub.connect().unwrap();
        hub.select_role(&a, Role::Admin).unwrap();
        hub.select_role(&b, Role::Bus).unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        assert_eq!(hub.on_location(&a, 10.0, 20.0).unwrap(), 3);
        let expected = ServerEvent::ReceiveLocation(LocationEvent {
            id: a.clone(),
            latitude: 10.0,
            longitude: 20.0,
            role: Some(Role::Admin),
        });
        assert_eq!(drain(&mut rx_a), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_b), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_c), vec![expected]);

        // No role held: tagged as null
        hub.on_location(&c, -1.5, 2.5).unwrap();
        match drain(&mut rx_a).as_slice() {
            [ServerEvent::ReceiveLocation(event)] => {
                assert_eq!(event.id, c);
                assert_eq!(event.role, None);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_location_is_dropped() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().unwrap();
        drain(&mut rx_a);

        let err = hub.on_location(&a, 95.0, 0.0).unwrap_err();
        assert!(err.is_ignorable());
        assert!(hub.on_location(&a, f64::NAN, 0.0).is_err());
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn test_disconnect_releases_then_announces() {
        let hub = Hub::default();
        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        hub.select_role(&a, Role::Admin).unwrap();
        hub.select_role(&b, Role::Bus).unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        assert!(hub.on_disconnect(&a));
        assert_eq!(hub.resolve(&a), None);
        assert_eq!(
            hub.assignments(),
            RoleAssignments { admin_id: None, bus_id: Some(b.clone()) }
        );
        assert_eq!(
            drain(&mut rx_b),
            vec![assignments(None, Some(&b)), ServerEvent::UserDisconnected(a.clone())]
        );

        // The departed peer's queue is closed once everything queued is read
        assert!(drain(&mut rx_a).is_empty());
        assert!(rx_a.try_recv().is_err());

        // Second disconnect is a no-op
        assert!(!hub.on_disconnect(&a));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_freed_role_can_be_reclaimed() {
        let hub = Hub::default();
        let (a, _rx_a) = hub.connect().unwrap();
        let (b, _rx_b) = hub.connect().unwrap();

        hub.select_role(&a, Role::Bus).unwrap();
        assert!(!hub.select_role(&b, Role::Bus).unwrap());

        hub.on_disconnect(&a);
        assert!(hub.select_role(&b, Role::Bus).unwrap());
        assert_eq!(hub.resolve(&b), Some(Role::Bus));
    }

    #[test]
    fn test_unknown_connection_is_rejected() {
        let hub = Hub::default();
        let ghost = ConnectionId::from("ghost");

        assert!(matches!(
            hub.select_role(&ghost, Role::Admin),
            Err(WaypointError::UnknownConnection(_))
        ));
        assert!(hub.on_location(&ghost, 1.0, 1.0).is_err());
        assert!(!hub.on_disconnect(&ghost));
        assert_eq!(hub.assignments(), RoleAssignments::default());
    }

    #[test]
    fn test_capacity_limit() {
        let hub = Hub::new(HubConfig {
            max_connections: 2,
            send_queue_capacity: 8,
        });
        let (a, _rx_a) = hub.connect().unwrap();
        let _b = hub.connect().unwrap();
        assert!(hub.is_full());
        assert!(hub.connect().is_none());

        hub.on_disconnect(&a);
        assert!(hub.connect().is_some());
    }

    #[test]
    fn test_slow_peer_does_not_block_others() {
        let hub = Hub::new(HubConfig {
            max_connections: 8,
            send_queue_capacity: 2,
        });
        // Never drained: its queue already holds the two greeting frames
        let (_slow, _rx_slow) = hub.connect().unwrap();
        let (fast, mut rx_fast) = hub.connect().unwrap();
        drain(&mut rx_fast);

        let delivered = hub.on_location(&fast, 1.0, 2.0).unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(drain(&mut rx_fast).len(), 1);
    }

    #[test]
    fn test_dropped_receiver_is_tolerated() {
        let hub = Hub::default();
        let (a, rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        drop(rx_a);
        drain(&mut rx_b);

        // A's transport is gone but its disconnect has not run yet
        assert_eq!(hub.on_location(&b, 3.0, 4.0).unwrap(), 1);
        assert!(hub.on_disconnect(&a));
    }
}
