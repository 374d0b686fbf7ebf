use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use crates::domain::{
    entities::{
        bookings::{BookingEntity, InsertBookingEntity, UpdateBookingEntity},
        clients::InsertClientEntity,
        services::ServiceEntity,
    },
    repositories::{
        bookings::BookingRepository, businesses::BusinessRepository, catalog::CatalogRepository,
        notifications::BookingNotifier, view_cache::ViewCache,
    },
    value_objects::{
        booking_state::{BookingEvent, BookingState},
        bookings::{
            BookingDto, BookingListFilter, BookingSummaryDto, CreateBookingModel, MonthlyCap,
            PublicBookingModel, SlotReservation, UpdateBookingModel,
        },
        enums::booking_statuses::BookingStatus,
        iam::ActorContext,
        notifications::NotificationKind,
        plans::PlanLimits,
        resource_scope::ResourceScope,
        view_cache::{bookings_key, summary_key},
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{BookingError, UseCaseResult},
    side_effects::BookingSideEffects,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BookingPolicy {
    /// Gate creation on the plan's monthly booking allowance.
    pub enforce_monthly_limit: bool,
}

/// Read-check-write passes before a contended booking is reported to the caller.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// A guarded update that landed.
struct AppliedUpdate {
    entity: BookingEntity,
    from: BookingState,
    to: BookingState,
    moved: bool,
}

/// A validated request to occupy `[start_time, start_time + service duration)`.
struct Reservation {
    business_id: Uuid,
    client_id: Uuid,
    service: ServiceEntity,
    scope: ResourceScope,
    start_time: DateTime<Utc>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    cap: Option<MonthlyCap>,
}

pub struct BookingUseCase<B, C, Biz, V, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    Biz: BusinessRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    catalog_repo: Arc<C>,
    business_repo: Arc<Biz>,
    side_effects: Arc<BookingSideEffects<V, N>>,
    policy: BookingPolicy,
}

impl<B, C, Biz, V, N> BookingUseCase<B, C, Biz, V, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    Biz: BusinessRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    pub fn new(
        booking_repo: Arc<B>,
        catalog_repo: Arc<C>,
        business_repo: Arc<Biz>,
        side_effects: Arc<BookingSideEffects<V, N>>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            booking_repo,
            catalog_repo,
            business_repo,
            side_effects,
            policy,
        }
    }

    pub async fn create_booking(
        &self,
        actor: ActorContext,
        model: CreateBookingModel,
    ) -> UseCaseResult<BookingDto> {
        let business_id = actor.business_id;
        info!(
            %business_id,
            actor_id = %actor.actor_id,
            client_id = %model.client_id,
            service_id = %model.service_id,
            start_time = %model.start_time,
            "bookings: create requested"
        );
        Self::require(
            actor.effective_permissions().can_manage_bookings,
            "missing can_manage_bookings",
        )?;

        self.catalog_repo
            .find_client(business_id, model.client_id)
            .await
            .map_err(|err| Self::internal(err, "failed to load client"))?
            .ok_or(BookingError::NotFound("client"))?;

        let service = self.load_service(business_id, model.service_id).await?;
        self.ensure_scope_exists(business_id, model.scope()).await?;
        let cap = self.monthly_cap(business_id).await?;

        let booking = self
            .reserve(Reservation {
                business_id,
                client_id: model.client_id,
                service,
                scope: model.scope(),
                start_time: model.start_time,
                notes: model.notes,
                created_by: Some(actor.actor_id),
                cap,
            })
            .await?;

        Ok(booking)
    }

    /// Booking from the public page. The client is matched by email or created.
    pub async fn create_public_booking(
        &self,
        business_id: Uuid,
        model: PublicBookingModel,
        now: DateTime<Utc>,
    ) -> UseCaseResult<BookingDto> {
        info!(
            %business_id,
            service_id = %model.service_id,
            start_time = %model.start_time,
            pay_online = model.pay_online,
            "bookings: public create requested"
        );

        let name = model.client.name.trim().to_string();
        let email = model.client.email.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(BookingError::Validation("client name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(BookingError::Validation("client email is invalid".to_string()));
        }
        if model.start_time <= now {
            return Err(BookingError::Validation(
                "start time must be in the future".to_string(),
            ));
        }

        let scope = ResourceScope::new(model.location_id, model.staff_id);
        let service = self.load_service(business_id, model.service_id).await?;
        self.ensure_scope_exists(business_id, scope).await?;
        let cap = self.monthly_cap(business_id).await?;

        let client = self
            .catalog_repo
            .find_or_create_client(InsertClientEntity {
                business_id,
                name,
                email: Some(email),
                phone: model.client.phone.filter(|phone| !phone.trim().is_empty()),
            })
            .await
            .map_err(|err| Self::internal(err, "failed to find or create client"))?;

        self.reserve(Reservation {
            business_id,
            client_id: client.id,
            service,
            scope,
            start_time: model.start_time,
            notes: model.notes,
            created_by: None,
            cap,
        })
        .await
    }

    pub async fn update_booking(
        &self,
        actor: ActorContext,
        booking_id: Uuid,
        patch: UpdateBookingModel,
    ) -> UseCaseResult<BookingDto> {
        let business_id = actor.business_id;
        info!(%business_id, %booking_id, actor_id = %actor.actor_id, "bookings: update requested");
        Self::require(
            actor.effective_permissions().can_manage_bookings,
            "missing can_manage_bookings",
        )?;
        if patch.is_empty() {
            return Err(BookingError::Validation("nothing to update".to_string()));
        }

        if let Some(Some(staff_id)) = patch.staff_id {
            self.ensure_scope_exists(business_id, ResourceScope::new(None, Some(staff_id)))
                .await?;
        }

        let mut attempt = 0;
        let applied = loop {
            attempt += 1;
            let booking = self.load_booking(business_id, booking_id).await?;
            if let Some(applied) = self.try_update(booking, &patch).await? {
                break applied;
            }
            if attempt == MAX_WRITE_ATTEMPTS {
                return Err(Self::changed_concurrently(business_id, booking_id));
            }
            warn!(%business_id, %booking_id, attempt, "bookings: booking changed during update, retrying");
        };

        let dto = BookingDto::from(applied.entity);
        self.side_effects.invalidate_tenant(business_id).await;
        if applied.to.status != applied.from.status {
            match applied.to.status {
                BookingStatus::Confirmed => {
                    self.side_effects.notify(NotificationKind::BookingConfirmed, &dto)
                }
                BookingStatus::Cancelled => {
                    self.side_effects.notify(NotificationKind::BookingCancelled, &dto)
                }
                _ => {}
            }
        }

        info!(
            %business_id,
            %booking_id,
            status = %dto.status,
            payment_status = %dto.payment_status,
            moved = applied.moved,
            "bookings: booking updated"
        );
        Ok(dto)
    }

    pub async fn cancel_booking(
        &self,
        actor: ActorContext,
        booking_id: Uuid,
    ) -> UseCaseResult<BookingDto> {
        let business_id = actor.business_id;
        info!(%business_id, %booking_id, actor_id = %actor.actor_id, "bookings: cancel requested");
        Self::require(
            actor.effective_permissions().can_manage_bookings,
            "missing can_manage_bookings",
        )?;

        let mut attempt = 0;
        let updated = loop {
            attempt += 1;
            let booking = self.load_booking(business_id, booking_id).await?;
            let current = Self::state_of(&booking)?;
            let transition = current.apply(BookingEvent::Cancel).map_err(|err| {
                let err = BookingError::from(err);
                warn!(
                    %business_id,
                    %booking_id,
                    status = err.status_code().as_u16(),
                    "bookings: cancel rejected"
                );
                err
            })?;

            let changes = UpdateBookingEntity {
                status: Some(transition.to.status.to_string()),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            if let Some(updated) = self
                .write_update(business_id, booking_id, current, changes)
                .await?
            {
                break updated;
            }
            if attempt == MAX_WRITE_ATTEMPTS {
                return Err(Self::changed_concurrently(business_id, booking_id));
            }
            warn!(%business_id, %booking_id, attempt, "bookings: booking changed during cancel, retrying");
        };

        let dto = BookingDto::from(updated);
        self.side_effects.invalidate_tenant(business_id).await;
        self.side_effects
            .notify(NotificationKind::BookingCancelled, &dto);

        info!(%business_id, %booking_id, "bookings: booking cancelled");
        Ok(dto)
    }

    pub async fn delete_booking(&self, actor: ActorContext, booking_id: Uuid) -> UseCaseResult<()> {
        let business_id = actor.business_id;
        info!(%business_id, %booking_id, actor_id = %actor.actor_id, "bookings: delete requested");
        Self::require(
            actor.effective_permissions().can_delete_bookings,
            "missing can_delete_bookings",
        )?;

        let deleted = self
            .booking_repo
            .delete(business_id, booking_id)
            .await
            .map_err(|err| Self::internal(err, "failed to delete booking"))?;

        if !deleted {
            return Err(BookingError::NotFound("booking"));
        }

        self.side_effects.invalidate_tenant(business_id).await;
        info!(%business_id, %booking_id, "bookings: booking deleted");
        Ok(())
    }

    pub async fn get_booking(
        &self,
        actor: ActorContext,
        booking_id: Uuid,
    ) -> UseCaseResult<BookingDto> {
        let booking = self.load_booking(actor.business_id, booking_id).await?;
        Ok(BookingDto::from(booking))
    }

    pub async fn list_bookings(
        &self,
        actor: ActorContext,
        filter: BookingListFilter,
    ) -> UseCaseResult<Vec<BookingDto>> {
        let business_id = actor.business_id;
        Self::require(
            actor.effective_permissions().can_view_all_bookings,
            "missing can_view_all_bookings",
        )?;

        let key = bookings_key(business_id, &filter);
        if let Some(cached) = self.side_effects.read_view::<Vec<BookingDto>>(&key).await {
            return Ok(cached);
        }

        let bookings: Vec<BookingDto> = self
            .booking_repo
            .list_for_business(business_id, filter)
            .await
            .map_err(|err| Self::internal(err, "failed to list bookings"))?
            .into_iter()
            .map(BookingDto::from)
            .collect();

        self.side_effects.store_view(key, &bookings).await;
        info!(%business_id, count = bookings.len(), "bookings: list loaded");
        Ok(bookings)
    }

    pub async fn booking_summary(&self, actor: ActorContext) -> UseCaseResult<BookingSummaryDto> {
        let business_id = actor.business_id;
        Self::require(
            actor.effective_permissions().can_view_all_bookings,
            "missing can_view_all_bookings",
        )?;

        let key = summary_key(business_id);
        if let Some(cached) = self.side_effects.read_view::<BookingSummaryDto>(&key).await {
            return Ok(cached);
        }

        let bookings: Vec<BookingDto> = self
            .booking_repo
            .list_for_business(business_id, BookingListFilter::default())
            .await
            .map_err(|err| Self::internal(err, "failed to load bookings for summary"))?
            .into_iter()
            .map(BookingDto::from)
            .collect();

        let summary = BookingSummaryDto::from_bookings(&bookings);
        self.side_effects.store_view(key, &summary).await;
        Ok(summary)
    }

    /// One read-check-write pass. `None` when the booking changed after it was read.
    async fn try_update(
        &self,
        booking: BookingEntity,
        patch: &UpdateBookingModel,
    ) -> UseCaseResult<Option<AppliedUpdate>> {
        let business_id = booking.business_id;
        let booking_id = booking.id;
        let current = Self::state_of(&booking)?;

        let mut next = current;
        if let Some(status) = patch.status {
            next = next.apply(BookingEvent::SetStatus(status))?.to;
        }
        if let Some(payment_status) = patch.payment_status {
            next = next.apply(BookingEvent::SetPaymentStatus(payment_status))?.to;
        }

        let start_time = patch.start_time.unwrap_or(booking.start_time);
        let staff_id = patch.staff_id.unwrap_or(booking.staff_id);
        let moved = start_time != booking.start_time || staff_id != booking.staff_id;

        let mut changes = UpdateBookingEntity {
            staff_id: patch.staff_id,
            notes: patch.notes.clone(),
            status: (next.status != current.status).then(|| next.status.to_string()),
            payment_status: (next.payment_status != current.payment_status)
                .then(|| next.payment_status.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        if moved {
            // The booked duration travels with the booking.
            let duration = booking.end_time - booking.start_time;
            changes.start_time = Some(start_time);
            changes.end_time = Some(start_time + duration);
        }

        let written = if moved && next.status.holds_slot() {
            let scope = ResourceScope::new(booking.location_id, staff_id);
            match self
                .booking_repo
                .reschedule_if_slot_free(business_id, booking_id, current, scope, changes)
                .await
                .map_err(|err| Self::internal(err, "failed to reschedule booking"))?
            {
                SlotReservation::Reserved(entity) => Some(entity),
                SlotReservation::Stale => None,
                SlotReservation::Conflict(conflict) => {
                    warn!(
                        %business_id,
                        %booking_id,
                        conflicting_booking_id = %conflict.booking_id,
                        "bookings: reschedule rejected, slot unavailable"
                    );
                    return Err(BookingError::SlotUnavailable(conflict));
                }
            }
        } else {
            self.write_update(business_id, booking_id, current, changes)
                .await?
        };

        Ok(written.map(|entity| AppliedUpdate {
            entity,
            from: current,
            to: next,
            moved,
        }))
    }

    async fn reserve(&self, reservation: Reservation) -> UseCaseResult<BookingDto> {
        let Reservation {
            business_id,
            client_id,
            service,
            scope,
            start_time,
            notes,
            created_by,
            cap,
        } = reservation;

        let end_time = start_time
            .checked_add_signed(service.duration())
            .ok_or_else(|| BookingError::Validation("start time is out of range".to_string()))?;

        let now = Utc::now();
        let insert = InsertBookingEntity {
            id: Uuid::new_v4(),
            business_id,
            client_id,
            service_id: service.id,
            location_id: scope.location_id,
            staff_id: scope.staff_id,
            created_by,
            start_time,
            end_time,
            status: BookingState::INITIAL.status.to_string(),
            payment_status: BookingState::INITIAL.payment_status.to_string(),
            total_amount_minor: service.price_minor,
            notes,
            created_at: now,
            updated_at: now,
        };

        let booking = match self
            .booking_repo
            .insert_if_slot_free(insert, cap)
            .await
            .map_err(|err| Self::internal(err, "failed to insert booking"))?
        {
            SlotReservation::Reserved(entity) => BookingDto::from(entity),
            SlotReservation::Conflict(conflict) => {
                warn!(
                    %business_id,
                    conflicting_booking_id = %conflict.booking_id,
                    %start_time,
                    %end_time,
                    "bookings: slot unavailable"
                );
                return Err(BookingError::SlotUnavailable(conflict));
            }
            SlotReservation::LimitReached { limit, current } => {
                let err = BookingError::MonthlyBookingLimit { limit, current };
                warn!(
                    %business_id,
                    limit,
                    current,
                    status = err.status_code().as_u16(),
                    "bookings: monthly booking limit reached"
                );
                return Err(err);
            }
            SlotReservation::Stale => {
                return Err(Self::internal(
                    anyhow!("insert reported a stale booking"),
                    "failed to insert booking",
                ));
            }
        };

        self.side_effects.invalidate_tenant(business_id).await;
        self.side_effects
            .notify(NotificationKind::BookingCreated, &booking);

        info!(
            %business_id,
            booking_id = %booking.id,
            %start_time,
            %end_time,
            total_amount_minor = booking.total_amount_minor,
            "bookings: booking created"
        );
        Ok(booking)
    }

    async fn load_booking(&self, business_id: Uuid, booking_id: Uuid) -> UseCaseResult<BookingEntity> {
        self.booking_repo
            .find_by_id(business_id, booking_id)
            .await
            .map_err(|err| Self::internal(err, "failed to load booking"))?
            .ok_or(BookingError::NotFound("booking"))
    }

    async fn load_service(&self, business_id: Uuid, service_id: Uuid) -> UseCaseResult<ServiceEntity> {
        self.catalog_repo
            .find_service(business_id, service_id)
            .await
            .map_err(|err| Self::internal(err, "failed to load service"))?
            .ok_or(BookingError::NotFound("service"))
    }

    async fn ensure_scope_exists(&self, business_id: Uuid, scope: ResourceScope) -> UseCaseResult<()> {
        if let Some(location_id) = scope.location_id {
            let exists = self
                .catalog_repo
                .location_exists(business_id, location_id)
                .await
                .map_err(|err| Self::internal(err, "failed to check location"))?;
            if !exists {
                return Err(BookingError::NotFound("location"));
            }
        }

        if let Some(staff_id) = scope.staff_id {
            let exists = self
                .catalog_repo
                .staff_exists(business_id, staff_id)
                .await
                .map_err(|err| Self::internal(err, "failed to check staff"))?;
            if !exists {
                return Err(BookingError::NotFound("staff"));
            }
        }

        Ok(())
    }

    /// The plan's monthly allowance, when enforced and finite. Checked by the repository
    /// in the same unit as the insert.
    async fn monthly_cap(&self, business_id: Uuid) -> UseCaseResult<Option<MonthlyCap>> {
        if !self.policy.enforce_monthly_limit {
            return Ok(None);
        }

        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(|err| Self::internal(err, "failed to load business"))?
            .ok_or(BookingError::NotFound("business"))?;

        let Some(limit) = PlanLimits::for_tier(business.plan_tier()).max_monthly_bookings else {
            return Ok(None);
        };

        let (from, to) = month_bounds(Utc::now())
            .ok_or_else(|| BookingError::Internal(anyhow!("current month is out of range")))?;

        Ok(Some(MonthlyCap { limit, from, to }))
    }

    async fn write_update(
        &self,
        business_id: Uuid,
        booking_id: Uuid,
        expected: BookingState,
        changes: UpdateBookingEntity,
    ) -> UseCaseResult<Option<BookingEntity>> {
        self.booking_repo
            .update(business_id, booking_id, expected, changes)
            .await
            .map_err(|err| Self::internal(err, "failed to update booking"))
    }

    fn state_of(booking: &BookingEntity) -> UseCaseResult<BookingState> {
        booking
            .state()
            .map_err(|err| Self::internal(err, "stored booking state is unreadable"))
    }

    fn changed_concurrently(business_id: Uuid, booking_id: Uuid) -> BookingError {
        let err = BookingError::InvalidState(
            "booking is being changed concurrently, reload and retry".to_string(),
        );
        warn!(
            %business_id,
            %booking_id,
            attempts = MAX_WRITE_ATTEMPTS,
            status = err.status_code().as_u16(),
            "bookings: giving up on contended booking"
        );
        err
    }

    fn require(allowed: bool, reason: &'static str) -> UseCaseResult<()> {
        if allowed {
            Ok(())
        } else {
            warn!(reason, "bookings: permission denied");
            Err(BookingError::Forbidden(reason))
        }
    }

    fn internal(err: anyhow::Error, context: &'static str) -> BookingError {
        error!(db_error = ?err, "bookings: {context}");
        BookingError::Internal(err)
    }
}

/// `[first day of the month, first day of the next month)` in UTC.
pub fn month_bounds(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    Some((
        first.and_hms_opt(0, 0, 0)?.and_utc(),
        next.and_hms_opt(0, 0, 0)?.and_utc(),
    ))
}

#[cfg(test)]
mod tests;
