//! Role Registry: who holds which singleton role.
//!
//! Two slots, `admin` and `bus`, each empty or holding one live connection.
//! Claims are first come, first served. A held slot is never stolen; it only
//! frees up when its holder is released.

use waypoint_common::{ConnectionId, Role, RoleAssignments};

/// Owner of the role assignment state. Not synchronized on its own; the
/// hub keeps it behind the same lock as the connection set.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    admin: Option<ConnectionId>,
    bus: Option<ConnectionId>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Admin => &mut self.admin,
            Role::Bus => &mut self.bus,
        }
    }

    fn slot(&self, role: Role) -> Option<&ConnectionId> {
        match role {
            Role::Admin => self.admin.as_ref(),
            Role::Bus => self.bus.as_ref(),
        }
    }

    /// Claim `role` for `id`.
    ///
    /// Returns `true` if the slot was free and is now held by `id`. A taken
    /// slot, or a connection that already holds the other role, is a silent
    /// no-op returning `false`.
    pub fn select(&mut self, id: &ConnectionId, role: Role) -> bool {
        if let Some(held) = self.resolve(id) {
            if held != role {
                tracing::debug!(
                    connection_id = %id,
                    held = %held,
                    requested = %role,
                    "Connection already holds a role, ignoring"
                );
            }
            return false;
        }

        if let Some(holder) = self.slot(role) {
            tracing::debug!(
                connection_id = %id,
                holder = %holder,
                role = %role,
                "Role already taken, ignoring"
            );
            return false;
        }

        *self.slot_mut(role) = Some(id.clone());
        true
    }

    /// Role currently held by `id`, if any
    pub fn resolve(&self, id: &ConnectionId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.slot(*role) == Some(id))
    }

    /// Clear whichever slot `id` occupies. Unknown ids are a no-op.
    pub fn release(&mut self, id: &ConnectionId) -> Option<Role> {
        let role = self.resolve(id)?;
        *self.slot_mut(role) = None;
        Some(role)
    }

    /// Snapshot of the current assignment state
    pub fn assignments(&self) -> RoleAssignments {
        RoleAssignments {
            admin_id: self.admin.clone(),
            bus_id: self.bus.clone(),
        }
    }
}
