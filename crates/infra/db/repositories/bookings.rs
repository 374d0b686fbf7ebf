use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    OptionalExtension, RunQueryDsl,
    dsl::exists,
    insert_into,
    pg::{Pg, PgConnection},
    prelude::*,
    result::Error as DieselError,
    select,
    sql_types::BigInt,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{bookings, processed_payment_events},
    },
};
use domain::{
    entities::{
        bookings::{BookingEntity, InsertBookingEntity, UpdateBookingEntity},
        payment_events::InsertProcessedPaymentEventEntity,
    },
    repositories::bookings::{BookingRepository, PaymentEventOutcome},
    value_objects::{
        booking_state::BookingState,
        bookings::{BookingListFilter, MonthlyCap, SlotConflict, SlotReservation},
        enums::booking_statuses::BookingStatus,
        resource_scope::{ResourceScope, tenant_lock_key},
        time_grid::day_bounds,
    },
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    /// Tenant rows in exactly this scope. A `None` side matches only NULL.
    fn scoped(business_id: Uuid, scope: ResourceScope) -> bookings::BoxedQuery<'static, Pg> {
        let mut query = bookings::table
            .filter(bookings::business_id.eq(business_id))
            .into_boxed();

        query = match scope.location_id {
            Some(location_id) => query.filter(bookings::location_id.eq(location_id)),
            None => query.filter(bookings::location_id.is_null()),
        };
        query = match scope.staff_id {
            Some(staff_id) => query.filter(bookings::staff_id.eq(staff_id)),
            None => query.filter(bookings::staff_id.is_null()),
        };

        query
    }

    /// Slot-holding rows in `scope` intersecting `[from, to)`.
    fn overlapping(
        business_id: Uuid,
        scope: ResourceScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> bookings::BoxedQuery<'static, Pg> {
        Self::scoped(business_id, scope)
            .filter(bookings::start_time.lt(to))
            .filter(bookings::end_time.gt(from))
            .filter(bookings::status.ne_all(BookingStatus::released_values()))
    }

    /// Transaction-scoped advisory lock; released on commit or rollback.
    fn advisory_lock(conn: &mut PgConnection, lock_key: i64) -> QueryResult<()> {
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(lock_key)
            .execute(conn)?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn find_by_id(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = bookings::table
            .filter(bookings::id.eq(booking_id))
            .filter(bookings::business_id.eq(business_id))
            .select(BookingEntity::as_select())
            .first::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_for_business(
        &self,
        business_id: Uuid,
        filter: BookingListFilter,
    ) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = bookings::table
            .filter(bookings::business_id.eq(business_id))
            .into_boxed();

        if let Some(date) = filter.date {
            let (from, to) = day_bounds(date);
            query = query
                .filter(bookings::start_time.ge(from))
                .filter(bookings::start_time.lt(to));
        }
        if let Some(status) = filter.status {
            query = query.filter(bookings::status.eq(status.to_string()));
        }

        let results = query
            .order(bookings::start_time.asc())
            .load::<BookingEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_active_overlapping(
        &self,
        business_id: Uuid,
        scope: ResourceScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = Self::overlapping(business_id, scope, from, to)
            .order(bookings::start_time.asc())
            .load::<BookingEntity>(&mut conn)?;

        Ok(results)
    }

    async fn insert_if_slot_free(
        &self,
        booking: InsertBookingEntity,
        cap: Option<MonthlyCap>,
    ) -> Result<SlotReservation> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let business_id = booking.business_id;
        let scope = booking.scope();

        let reservation = conn.transaction::<SlotReservation, DieselError, _>(|conn| {
            // Tenant lock first, scope lock second, on every path.
            if let Some(cap) = cap {
                Self::advisory_lock(conn, tenant_lock_key(business_id))?;

                let current = bookings::table
                    .filter(bookings::business_id.eq(business_id))
                    .filter(bookings::created_at.ge(cap.from))
                    .filter(bookings::created_at.lt(cap.to))
                    .filter(bookings::status.ne(BookingStatus::Cancelled.to_string()))
                    .count()
                    .get_result::<i64>(conn)?;

                if current >= cap.limit {
                    return Ok(SlotReservation::LimitReached {
                        limit: cap.limit,
                        current,
                    });
                }
            }

            Self::advisory_lock(conn, scope.lock_key(business_id))?;

            let existing = Self::overlapping(business_id, scope, booking.start_time, booking.end_time)
                .order(bookings::start_time.asc())
                .first::<BookingEntity>(conn)
                .optional()?;

            if let Some(existing) = existing {
                return Ok(SlotReservation::Conflict(SlotConflict::from(&existing)));
            }

            let inserted = insert_into(bookings::table)
                .values(&booking)
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(conn)?;

            Ok(SlotReservation::Reserved(inserted))
        })?;

        Ok(reservation)
    }

    async fn reschedule_if_slot_free(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        scope: ResourceScope,
        changes: UpdateBookingEntity,
    ) -> Result<SlotReservation> {
        let (Some(start_time), Some(end_time)) = (changes.start_time, changes.end_time) else {
            return Err(anyhow!("reschedule requires both start and end time"));
        };

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let reservation = conn.transaction::<SlotReservation, DieselError, _>(|conn| {
            Self::advisory_lock(conn, scope.lock_key(business_id))?;

            // Row lock holds the checked state until commit.
            let unchanged = bookings::table
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::business_id.eq(business_id))
                .filter(bookings::status.eq(expected.status.to_string()))
                .filter(bookings::payment_status.eq(expected.payment_status.to_string()))
                .select(bookings::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?;

            if unchanged.is_none() {
                return Ok(SlotReservation::Stale);
            }

            let existing = Self::overlapping(business_id, scope, start_time, end_time)
                .filter(bookings::id.ne(booking_id))
                .order(bookings::start_time.asc())
                .first::<BookingEntity>(conn)
                .optional()?;

            if let Some(existing) = existing {
                return Ok(SlotReservation::Conflict(SlotConflict::from(&existing)));
            }

            let updated = update(
                bookings::table
                    .filter(bookings::id.eq(booking_id))
                    .filter(bookings::business_id.eq(business_id)),
            )
            .set(&changes)
            .returning(BookingEntity::as_returning())
            .get_result::<BookingEntity>(conn)?;

            Ok(SlotReservation::Reserved(updated))
        })?;

        Ok(reservation)
    }

    async fn update(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        changes: UpdateBookingEntity,
    ) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(
            bookings::table
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::business_id.eq(business_id))
                .filter(bookings::status.eq(expected.status.to_string()))
                .filter(bookings::payment_status.eq(expected.payment_status.to_string())),
        )
        .set(&changes)
        .returning(BookingEntity::as_returning())
        .get_result::<BookingEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }

    async fn delete(&self, business_id: Uuid, booking_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = diesel::delete(
            bookings::table
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::business_id.eq(business_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    async fn is_payment_event_processed(&self, event_id: String) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let processed = select(exists(
            processed_payment_events::table
                .filter(processed_payment_events::event_id.eq(event_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(processed)
    }

    async fn apply_payment_event(
        &self,
        ledger: InsertProcessedPaymentEventEntity,
        business_id: Uuid,
        expected: BookingState,
        changes: Option<UpdateBookingEntity>,
    ) -> Result<PaymentEventOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let booking_id = ledger.booking_id;

        let result = conn.transaction::<PaymentEventOutcome, DieselError, _>(|conn| {
            let recorded = insert_into(processed_payment_events::table)
                .values(&ledger)
                .on_conflict_do_nothing()
                .execute(conn)?;

            if recorded == 0 {
                return Ok(PaymentEventOutcome::Duplicate);
            }

            let booking = match changes {
                Some(changes) => update(
                    bookings::table
                        .filter(bookings::id.eq(booking_id))
                        .filter(bookings::business_id.eq(business_id))
                        .filter(bookings::status.eq(expected.status.to_string()))
                        .filter(bookings::payment_status.eq(expected.payment_status.to_string())),
                )
                .set(&changes)
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(conn)
                .optional()?,
                None => bookings::table
                    .filter(bookings::id.eq(booking_id))
                    .filter(bookings::business_id.eq(business_id))
                    .select(BookingEntity::as_select())
                    .first::<BookingEntity>(conn)
                    .optional()?,
            };

            // No row means the booking changed underneath us; drop the ledger row too.
            booking
                .map(PaymentEventOutcome::Applied)
                .ok_or(DieselError::RollbackTransaction)
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(DieselError::RollbackTransaction) => Ok(PaymentEventOutcome::Stale),
            Err(err) => Err(err.into()),
        }
    }
}
