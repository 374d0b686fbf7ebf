use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        booking_state::BookingState,
        enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
        resource_scope::ResourceScope,
    },
    infra::db::postgres::schema::bookings,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub total_amount_minor: i64,
    pub notes: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingEntity {
    pub fn scope(&self) -> ResourceScope {
        ResourceScope::new(self.location_id, self.staff_id)
    }

    pub fn state(&self) -> Result<BookingState> {
        let status = BookingStatus::from_str(&self.status)
            .ok_or_else(|| anyhow!("unknown booking status: {}", self.status))?;
        let payment_status = PaymentStatus::from_str(&self.payment_status)
            .ok_or_else(|| anyhow!("unknown payment status: {}", self.payment_status))?;

        Ok(BookingState::new(status, payment_status))
    }

    pub fn holds_slot(&self) -> bool {
        BookingStatus::from_str(&self.status)
            .map(|status| status.holds_slot())
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub location_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub total_amount_minor: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertBookingEntity {
    pub fn scope(&self) -> ResourceScope {
        ResourceScope::new(self.location_id, self.staff_id)
    }

    pub fn into_entity(self) -> BookingEntity {
        BookingEntity {
            id: self.id,
            business_id: self.business_id,
            client_id: self.client_id,
            service_id: self.service_id,
            location_id: self.location_id,
            staff_id: self.staff_id,
            created_by: self.created_by,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            payment_status: self.payment_status,
            total_amount_minor: self.total_amount_minor,
            notes: self.notes,
            payment_reference: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Partial update. `Some(None)` on a nullable column writes NULL.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct UpdateBookingEntity {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub staff_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub notes: Option<Option<String>>,
    pub payment_reference: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateBookingEntity {
    pub fn apply_to(&self, booking: &mut BookingEntity) {
        if let Some(start_time) = self.start_time {
            booking.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            booking.end_time = end_time;
        }
        if let Some(staff_id) = self.staff_id {
            booking.staff_id = staff_id;
        }
        if let Some(status) = &self.status {
            booking.status = status.clone();
        }
        if let Some(payment_status) = &self.payment_status {
            booking.payment_status = payment_status.clone();
        }
        if let Some(notes) = &self.notes {
            booking.notes = notes.clone();
        }
        if let Some(payment_reference) = &self.payment_reference {
            booking.payment_reference = payment_reference.clone();
        }
        if let Some(updated_at) = self.updated_at {
            booking.updated_at = updated_at;
        }
    }
}
