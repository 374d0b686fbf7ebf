use std::sync::Arc;

use chrono::{DateTime, Utc};
use crates::domain::{
    repositories::{
        bookings::BookingRepository, catalog::CatalogRepository,
        notifications::BookingNotifier, view_cache::ViewCache,
    },
    value_objects::{
        bookings::{AvailabilityQuery, SlotDto},
        time_grid::{BusinessHours, day_bounds, generate_grid},
        view_cache::availability_key,
    },
};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    errors::{BookingError, UseCaseResult},
    side_effects::BookingSideEffects,
};

/// Who is asking. Public callers never see slots that already started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityMode {
    Staff,
    Public { now: DateTime<Utc> },
}

pub struct AvailabilityUseCase<B, C, V, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    catalog_repo: Arc<C>,
    side_effects: Arc<BookingSideEffects<V, N>>,
    hours: BusinessHours,
}

impl<B, C, V, N> AvailabilityUseCase<B, C, V, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    V: ViewCache + Send + Sync + 'static,
    N: BookingNotifier + Send + Sync + 'static,
{
    pub fn new(
        booking_repo: Arc<B>,
        catalog_repo: Arc<C>,
        side_effects: Arc<BookingSideEffects<V, N>>,
        hours: BusinessHours,
    ) -> Self {
        Self {
            booking_repo,
            catalog_repo,
            side_effects,
            hours,
        }
    }

    pub async fn resolve(
        &self,
        business_id: Uuid,
        query: AvailabilityQuery,
        mode: AvailabilityMode,
    ) -> UseCaseResult<Vec<SlotDto>> {
        let key = availability_key(business_id, &query);
        let slots = match self.side_effects.read_view::<Vec<SlotDto>>(&key).await {
            Some(cached) => cached,
            None => {
                let slots = self.compute(business_id, query).await?;
                self.side_effects.store_view(key, &slots).await;
                slots
            }
        };

        Ok(match mode {
            AvailabilityMode::Staff => slots,
            AvailabilityMode::Public { now } => slots
                .into_iter()
                .map(|slot| SlotDto {
                    available: slot.available && slot.time > now,
                    ..slot
                })
                .collect(),
        })
    }

    async fn compute(
        &self,
        business_id: Uuid,
        query: AvailabilityQuery,
    ) -> UseCaseResult<Vec<SlotDto>> {
        let service = self
            .catalog_repo
            .find_service(business_id, query.service_id)
            .await
            .map_err(|err| {
                error!(%business_id, service_id = %query.service_id, db_error = ?err, "availability: failed to load service");
                BookingError::Internal(err)
            })?
            .ok_or(BookingError::NotFound("service"))?;

        let grid = generate_grid(
            query.date,
            i64::from(service.duration_minutes),
            self.hours,
        );

        let (day_start, day_end) = day_bounds(query.date);
        let occupied = self
            .booking_repo
            .list_active_overlapping(business_id, query.scope(), day_start, day_end)
            .await
            .map_err(|err| {
                error!(%business_id, date = %query.date, db_error = ?err, "availability: failed to load bookings");
                BookingError::Internal(err)
            })?;

        let slots: Vec<SlotDto> = grid
            .into_iter()
            .map(|slot| SlotDto {
                time: slot.start,
                end: slot.end,
                available: !occupied
                    .iter()
                    .any(|booking| slot.overlaps(booking.start_time, booking.end_time)),
            })
            .collect();

        info!(
            %business_id,
            service_id = %query.service_id,
            date = %query.date,
            candidates = slots.len(),
            occupied = occupied.len(),
            "availability: computed"
        );
        Ok(slots)
    }
}
