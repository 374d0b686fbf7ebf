use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The (location, staff) pair inside which bookings compete for time.
/// `None` on either side is its own scope, not a wildcard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceScope {
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
}

impl ResourceScope {
    pub fn new(location_id: Option<Uuid>, staff_id: Option<Uuid>) -> Self {
        Self {
            location_id,
            staff_id,
        }
    }

    /// Stable 64-bit key for `pg_advisory_xact_lock`, identical across processes.
    pub fn lock_key(&self, business_id: Uuid) -> i64 {
        let mut hasher = Sha256::new();
        hasher.update(business_id.as_bytes());
        for part in [self.location_id, self.staff_id] {
            match part {
                Some(id) => {
                    hasher.update([1u8]);
                    hasher.update(id.as_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        key_from(hasher)
    }
}

/// Tenant-wide advisory lock key. Taken before any scope key.
pub fn tenant_lock_key(business_id: Uuid) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(business_id.as_bytes());
    hasher.update([2u8]);
    key_from(hasher)
}

fn key_from(hasher: Sha256) -> i64 {
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}
