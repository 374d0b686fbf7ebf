//! Fixtures and an in-memory booking store shared by the use-case tests.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use crates::domain::{
    entities::{
        bookings::{BookingEntity, InsertBookingEntity, UpdateBookingEntity},
        businesses::BusinessEntity,
        clients::ClientEntity,
        payment_events::InsertProcessedPaymentEventEntity,
        services::ServiceEntity,
    },
    repositories::bookings::{BookingRepository, PaymentEventOutcome},
    value_objects::{
        booking_state::BookingState,
        bookings::{BookingDto, BookingListFilter, MonthlyCap, SlotConflict, SlotReservation},
        enums::{actor_roles::ActorRole, booking_statuses::BookingStatus},
        iam::{ActorContext, StaffPermissions},
        resource_scope::ResourceScope,
        time_grid::overlaps,
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 5, 12).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    test_date().and_hms_opt(hour, minute, 0).unwrap().and_utc()
}

pub fn owner(business_id: Uuid) -> ActorContext {
    ActorContext::new(
        Uuid::new_v4(),
        business_id,
        ActorRole::Owner,
        StaffPermissions::default(),
    )
}

pub fn staff_with(business_id: Uuid, permissions: StaffPermissions) -> ActorContext {
    ActorContext::new(Uuid::new_v4(), business_id, ActorRole::Staff, permissions)
}

pub fn sample_service(business_id: Uuid, duration_minutes: i32, price_minor: i64) -> ServiceEntity {
    ServiceEntity {
        id: Uuid::new_v4(),
        business_id,
        name: "Haircut".to_string(),
        duration_minutes,
        price_minor,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn sample_client(business_id: Uuid) -> ClientEntity {
    ClientEntity {
        id: Uuid::new_v4(),
        business_id,
        name: "Jo Client".to_string(),
        email: Some("jo@example.com".to_string()),
        phone: None,
        created_at: Utc::now(),
    }
}

pub fn sample_business(business_id: Uuid, plan: &str) -> BusinessEntity {
    BusinessEntity {
        id: business_id,
        name: "Studio".to_string(),
        plan: plan.to_string(),
        created_at: Utc::now(),
    }
}

pub fn sample_booking(
    business_id: Uuid,
    start_time: DateTime<Utc>,
    minutes: i64,
    status: BookingStatus,
) -> BookingEntity {
    let now = Utc::now();
    BookingEntity {
        id: Uuid::new_v4(),
        business_id,
        client_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        location_id: None,
        staff_id: None,
        created_by: None,
        start_time,
        end_time: start_time + Duration::minutes(minutes),
        status: status.to_string(),
        payment_status: BookingState::INITIAL.payment_status.to_string(),
        total_amount_minor: 2500,
        notes: None,
        payment_reference: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_booking_dto() -> BookingDto {
    BookingDto::from(sample_booking(
        Uuid::new_v4(),
        at(10, 0),
        30,
        BookingStatus::Pending,
    ))
}

#[derive(Default)]
struct InMemoryState {
    bookings: Vec<BookingEntity>,
    ledger: HashSet<String>,
}

/// Single-lock store: the overlap check and the write happen under one guard, the way
/// the advisory lock serializes them in Postgres.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    state: Mutex<InMemoryState>,
}

impl InMemoryBookingRepository {
    pub fn with_bookings(bookings: Vec<BookingEntity>) -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                bookings,
                ledger: HashSet::new(),
            }),
        }
    }

    pub async fn snapshot(&self) -> Vec<BookingEntity> {
        self.state.lock().await.bookings.clone()
    }

    pub async fn ledger_len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    fn created_between(
        bookings: &[BookingEntity],
        business_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> i64 {
        bookings
            .iter()
            .filter(|b| b.business_id == business_id)
            .filter(|b| b.status != BookingStatus::Cancelled.as_str())
            .filter(|b| b.created_at >= from && b.created_at < to)
            .count() as i64
    }

    fn conflict_in(
        bookings: &[BookingEntity],
        business_id: Uuid,
        scope: ResourceScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Option<SlotConflict> {
        bookings
            .iter()
            .filter(|b| b.business_id == business_id && b.scope() == scope)
            .filter(|b| Some(b.id) != exclude && b.holds_slot())
            .find(|b| overlaps(start, end, b.start_time, b.end_time))
            .map(SlotConflict::from)
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Option<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .find(|b| b.id == booking_id && b.business_id == business_id)
            .cloned())
    }

    async fn list_for_business(
        &self,
        business_id: Uuid,
        filter: BookingListFilter,
    ) -> Result<Vec<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.business_id == business_id)
            .filter(|b| filter.date.is_none_or(|date| b.start_time.date_naive() == date))
            .filter(|b| filter.status.is_none_or(|status| b.status == status.as_str()))
            .cloned()
            .collect())
    }

    async fn list_active_overlapping(
        &self,
        business_id: Uuid,
        scope: ResourceScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| b.business_id == business_id && b.scope() == scope && b.holds_slot())
            .filter(|b| overlaps(from, to, b.start_time, b.end_time))
            .cloned()
            .collect())
    }

    async fn insert_if_slot_free(
        &self,
        booking: InsertBookingEntity,
        cap: Option<MonthlyCap>,
    ) -> Result<SlotReservation> {
        let mut state = self.state.lock().await;
        if let Some(cap) = cap {
            let current =
                Self::created_between(&state.bookings, booking.business_id, cap.from, cap.to);
            if current >= cap.limit {
                return Ok(SlotReservation::LimitReached {
                    limit: cap.limit,
                    current,
                });
            }
        }
        if let Some(conflict) = Self::conflict_in(
            &state.bookings,
            booking.business_id,
            booking.scope(),
            booking.start_time,
            booking.end_time,
            None,
        ) {
            return Ok(SlotReservation::Conflict(conflict));
        }

        let entity = booking.into_entity();
        state.bookings.push(entity.clone());
        Ok(SlotReservation::Reserved(entity))
    }

    async fn reschedule_if_slot_free(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        scope: ResourceScope,
        changes: UpdateBookingEntity,
    ) -> Result<SlotReservation> {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .bookings
            .iter()
            .position(|b| b.id == booking_id && b.business_id == business_id)
        else {
            return Ok(SlotReservation::Stale);
        };
        if state.bookings[index].state()? != expected {
            return Ok(SlotReservation::Stale);
        }

        let mut moved = state.bookings[index].clone();
        changes.apply_to(&mut moved);

        if let Some(conflict) = Self::conflict_in(
            &state.bookings,
            business_id,
            scope,
            moved.start_time,
            moved.end_time,
            Some(booking_id),
        ) {
            return Ok(SlotReservation::Conflict(conflict));
        }

        state.bookings[index] = moved.clone();
        Ok(SlotReservation::Reserved(moved))
    }

    async fn update(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        changes: UpdateBookingEntity,
    ) -> Result<Option<BookingEntity>> {
        let mut state = self.state.lock().await;
        let Some(booking) = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id && b.business_id == business_id)
        else {
            return Ok(None);
        };
        if booking.state()? != expected {
            return Ok(None);
        }

        changes.apply_to(booking);
        Ok(Some(booking.clone()))
    }

    async fn delete(&self, business_id: Uuid, booking_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.bookings.len();
        state
            .bookings
            .retain(|b| !(b.id == booking_id && b.business_id == business_id));
        Ok(state.bookings.len() < before)
    }

    async fn is_payment_event_processed(&self, event_id: String) -> Result<bool> {
        Ok(self.state.lock().await.ledger.contains(&event_id))
    }

    async fn apply_payment_event(
        &self,
        ledger: InsertProcessedPaymentEventEntity,
        business_id: Uuid,
        expected: BookingState,
        changes: Option<UpdateBookingEntity>,
    ) -> Result<PaymentEventOutcome> {
        let mut state = self.state.lock().await;
        if state.ledger.contains(&ledger.event_id) {
            return Ok(PaymentEventOutcome::Duplicate);
        }

        let Some(booking) = state
            .bookings
            .iter_mut()
            .find(|b| b.id == ledger.booking_id && b.business_id == business_id)
        else {
            return Ok(PaymentEventOutcome::Stale);
        };

        if booking.state()? != expected {
            return Ok(PaymentEventOutcome::Stale);
        }
        if let Some(changes) = changes {
            changes.apply_to(booking);
        }

        let applied = booking.clone();
        state.ledger.insert(ledger.event_id);
        Ok(PaymentEventOutcome::Applied(applied))
    }
}
