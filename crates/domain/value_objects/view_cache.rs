//! Tenant-scoped cache keys. Every key starts with `business:{id}:` so a tenant's
//! views can be dropped by prefix.

use uuid::Uuid;

use crate::domain::value_objects::bookings::{AvailabilityQuery, BookingListFilter};

pub fn tenant_prefix(business_id: Uuid) -> String {
    format!("business:{business_id}:")
}

pub fn summary_key(business_id: Uuid) -> String {
    format!("business:{business_id}:summary")
}

pub fn bookings_prefix(business_id: Uuid) -> String {
    format!("business:{business_id}:bookings:")
}

pub fn availability_prefix(business_id: Uuid) -> String {
    format!("business:{business_id}:availability:")
}

pub fn bookings_key(business_id: Uuid, filter: &BookingListFilter) -> String {
    let date = filter.date.map(|d| d.to_string()).unwrap_or_default();
    let status = filter.status.map(|s| s.to_string()).unwrap_or_default();
    format!("{}date={date}|status={status}", bookings_prefix(business_id))
}

pub fn availability_key(business_id: Uuid, query: &AvailabilityQuery) -> String {
    let location = query.location_id.map(|id| id.to_string()).unwrap_or_default();
    let staff = query.staff_id.map(|id| id.to_string()).unwrap_or_default();
    format!(
        "{}{}|{}|location={location}|staff={staff}",
        availability_prefix(business_id),
        query.service_id,
        query.date
    )
}

/// Prefixes a booking write must invalidate.
pub fn tenant_write_prefixes(business_id: Uuid) -> [String; 3] {
    [
        summary_key(business_id),
        bookings_prefix(business_id),
        availability_prefix(business_id),
    ]
}
