use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        bookings::{BookingEntity, InsertBookingEntity, UpdateBookingEntity},
        payment_events::InsertProcessedPaymentEventEntity,
    },
    value_objects::{
        booking_state::BookingState,
        bookings::{BookingListFilter, MonthlyCap, SlotReservation},
        resource_scope::ResourceScope,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEventOutcome {
    /// Ledger row written and the booking updated (or left as is when no changes were given).
    Applied(BookingEntity),
    /// The event id is already in the ledger. Nothing was written.
    Duplicate,
    /// The booking moved away from the expected state before the write. Nothing was written.
    Stale,
}

/// Every query is filtered by `business_id`; rows of other tenants are invisible.
#[automock]
#[async_trait]
pub trait BookingRepository {
    async fn find_by_id(&self, business_id: Uuid, booking_id: Uuid)
    -> Result<Option<BookingEntity>>;

    async fn list_for_business(
        &self,
        business_id: Uuid,
        filter: BookingListFilter,
    ) -> Result<Vec<BookingEntity>>;

    /// Slot-holding bookings in `scope` whose interval intersects `[from, to)`.
    async fn list_active_overlapping(
        &self,
        business_id: Uuid,
        scope: ResourceScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>>;

    /// Overlap check and insert as one atomic unit per resource scope. With a `cap`, the
    /// tenant's monthly count is checked in the same unit, serialized per tenant.
    async fn insert_if_slot_free(
        &self,
        booking: InsertBookingEntity,
        cap: Option<MonthlyCap>,
    ) -> Result<SlotReservation>;

    /// Same as `insert_if_slot_free` for a moved booking; the booking itself is
    /// excluded from the conflict set. Returns `Stale` unless the booking is still in
    /// `expected`.
    async fn reschedule_if_slot_free(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        scope: ResourceScope,
        changes: UpdateBookingEntity,
    ) -> Result<SlotReservation>;

    /// Writes `changes` only if the booking is still in `expected`. `None` when it is
    /// gone or has moved on.
    async fn update(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        changes: UpdateBookingEntity,
    ) -> Result<Option<BookingEntity>>;

    async fn delete(&self, business_id: Uuid, booking_id: Uuid) -> Result<bool>;

    async fn is_payment_event_processed(&self, event_id: String) -> Result<bool>;

    /// Writes the ledger row and, when `changes` is given, updates the booking only if it
    /// is still in `expected`. Both writes commit together or not at all.
    async fn apply_payment_event(
        &self,
        ledger: InsertProcessedPaymentEventEntity,
        business_id: Uuid,
        expected: BookingState,
        changes: Option<UpdateBookingEntity>,
    ) -> Result<PaymentEventOutcome>;
}
