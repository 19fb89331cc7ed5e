//! Client-side view of the tracking session.
//!
//! Folds server events into "me", "the other party", distance and ETA.
//! Locations are remembered per role together with the id that sent them,
//! so a `user-disconnected` clears the right party even after the
//! `role-assignments` that freed its slot has already arrived.

use std::fmt::Write as _;

use waypoint_common::geo::haversine_km;
use waypoint_common::{ConnectionId, Coordinates, Role, RoleAssignments, ServerEvent};

use crate::routing::RouteSummary;

/// What changed after applying an event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// Something visible changed; redraw
    pub redraw: bool,
    /// Both positions are known and a fresh route may be requested
    pub route_wanted: bool,
}

#[derive(Debug, Clone)]
struct Sighting {
    from: ConnectionId,
    at: Coordinates,
}

/// Route lookup outcome shown under the distance
#[derive(Debug, Clone, PartialEq)]
pub enum RouteStatus {
    Unknown,
    Found(RouteSummary),
    Failed(String),
}

#[derive(Debug)]
pub struct Dashboard {
    role: Role,
    my_id: Option<ConnectionId>,
    assignments: RoleAssignments,
    own: Option<Coordinates>,
    admin: Option<Sighting>,
    bus: Option<Sighting>,
    route: RouteStatus,
}

impl Dashboard {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            my_id: None,
            assignments: RoleAssignments::default(),
            own: None,
            admin: None,
            bus: None,
            route: RouteStatus::Unknown,
        }
    }

    /// True once the relay has confirmed this client as holder of its role
    pub fn role_granted(&self) -> bool {
        self.my_id
            .as_ref()
            .and_then(|me| self.assignments.role_of(me))
            == Some(self.role)
    }

    fn sighting(&self, role: Role) -> Option<&Sighting> {
        match role {
            Role::Admin => self.admin.as_ref(),
            Role::Bus => self.bus.as_ref(),
        }
    }

    fn sighting_mut(&mut self, role: Role) -> &mut Option<Sighting> {
        match role {
            Role::Admin => &mut self.admin,
            Role::Bus => &mut self.bus,
        }
    }

    /// Last known position of the other party
    pub fn other_position(&self) -> Option<Coordinates> {
        self.sighting(self.role.counterpart()).map(|s| s.at)
    }

    /// Straight-line distance between admin and bus, if both are known
    pub fn distance_km(&self) -> Option<f64> {
        let admin = self.position_of(Role::Admin)?;
        let bus = self.position_of(Role::Bus)?;
        Some(haversine_km(admin, bus))
    }

    fn position_of(&self, role: Role) -> Option<Coordinates> {
        if role == self.role {
            self.own.or_else(|| self.sighting(role).map(|s| s.at))
        } else {
            self.sighting(role).map(|s| s.at)
        }
    }

    /// Bus and admin positions for a route lookup (bus → admin)
    pub fn route_endpoints(&self) -> Option<(Coordinates, Coordinates)> {
        Some((self.position_of(Role::Bus)?, self.position_of(Role::Admin)?))
    }

    fn wants_route(&self) -> bool {
        self.role == Role::Admin && self.route_endpoints().is_some()
    }

    /// Record a position this client is about to publish
    pub fn set_own_position(&mut self, at: Coordinates) -> Change {
        self.own = Some(at);
        Change {
            redraw: true,
            route_wanted: self.wants_route(),
        }
    }

    pub fn set_route(&mut self, route: RouteStatus) {
        self.route = route;
    }

    pub fn apply(&mut self, event: ServerEvent) -> Change {
        match event {
            ServerEvent::Connected { id } => {
                tracing::info!(connection_id = %id, "Connected to relay");
                self.my_id = Some(id);
                Change::default()
            }
            ServerEvent::RoleAssignments(assignments) => {
                let changed = assignments != self.assignments;
                self.assignments = assignments;
                Change {
                    redraw: changed,
                    route_wanted: false,
                }
            }
            ServerEvent::ReceiveLocation(location) => {
                if self.my_id.as_ref() == Some(&location.id) {
                    // Our own report echoed back
                    return Change::default();
                }
                let Some(role) = location.role else {
                    // Untagged senders hold no role; nothing to show
                    return Change::default();
                };
                let at = location.coordinates();
                *self.sighting_mut(role) = Some(Sighting {
                    from: location.id,
                    at,
                });
                Change {
                    redraw: true,
                    route_wanted: self.wants_route(),
                }
            }
            ServerEvent::UserDisconnected(id) => {
                let mut cleared = false;
                for role in Role::ALL {
                    let slot = self.sighting_mut(role);
                    if slot.as_ref().is_some_and(|s| s.from == id) {
                        *slot = None;
                        cleared = true;
                    }
                }
                if cleared {
                    self.route = RouteStatus::Unknown;
                }
                Change {
                    redraw: cleared,
                    route_wanted: false,
                }
            }
        }
    }

    /// Text dashboard
    pub fn render(&self) -> String {
        let mut out = String::new();
        let counterpart = self.role.counterpart();

        let status = if self.role_granted() { "" } else { " (waiting for role)" };
        let _ = writeln!(out, "Your Role: {}{}", self.role.label(), status);

        match self.own {
            Some(at) => {
                let _ = writeln!(out, "Your Location: {at}");
            }
            None => {
                let _ = writeln!(out, "Your Location: Not available");
            }
        }

        match self.other_position() {
            Some(at) => {
                let _ = writeln!(out, "{} Location: {at}", counterpart.label());
            }
            None => {
                let _ = writeln!(out, "Other Location: Not available");
            }
        }

        // Only the admin sees distance and ETA
        if self.role == Role::Admin {
            if let Some(km) = self.distance_km() {
                let _ = writeln!(out, "Bus is {km:.2} km away from you.");
                match &self.route {
                    RouteStatus::Found(route) => {
                        let _ = writeln!(out, "Route distance: {:.2} km", route.distance_km);
                        let _ = writeln!(out, "Estimated arrival: {} min", route.duration_min);
                    }
                    RouteStatus::Failed(reason) => {
                        let _ = writeln!(out, "Route/ETA error: {reason}");
                    }
                    RouteStatus::Unknown => {}
                }
            }
        }

        out
    }
}
