use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::actor_roles::ActorRole;

/// Named staff capabilities. Unknown keys in a token are ignored, missing ones are `false`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StaffPermissions {
    pub can_manage_bookings: bool,
    pub can_delete_bookings: bool,
    pub can_manage_payments: bool,
    pub can_view_all_bookings: bool,
}

impl StaffPermissions {
    pub fn all() -> Self {
        Self {
            can_manage_bookings: true,
            can_delete_bookings: true,
            can_manage_payments: true,
            can_view_all_bookings: true,
        }
    }
}

/// Authenticated tenant and actor for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub actor_id: Uuid,
    pub business_id: Uuid,
    pub role: ActorRole,
    pub permissions: StaffPermissions,
}

impl ActorContext {
    pub fn new(
        actor_id: Uuid,
        business_id: Uuid,
        role: ActorRole,
        permissions: StaffPermissions,
    ) -> Self {
        Self {
            actor_id,
            business_id,
            role,
            permissions,
        }
    }

    pub fn effective_permissions(&self) -> StaffPermissions {
        if self.role.is_manager() {
            StaffPermissions::all()
        } else {
            self.permissions
        }
    }
}
