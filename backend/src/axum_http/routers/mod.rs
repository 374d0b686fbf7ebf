pub mod availability;
pub mod bookings;
pub mod payments;
pub mod plan_limits;
pub mod public_booking;

use std::sync::Arc;

use crates::{
    infra::{
        cache::memory_view_cache::MemoryViewCache,
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                bookings::BookingPostgres, businesses::BusinessPostgres, catalog::CatalogPostgres,
            },
        },
        notifications::dispatcher::NotificationDispatcher,
    },
    payments::stripe_client::StripeClient,
};

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::{
        availability::AvailabilityUseCase,
        booking_payments::BookingPaymentUseCase,
        bookings::{BookingPolicy, BookingUseCase},
        plan_limits::PlanLimitUseCase,
        side_effects::BookingSideEffects,
    },
};

pub type SideEffects = BookingSideEffects<MemoryViewCache, NotificationDispatcher>;
pub type Bookings = BookingUseCase<
    BookingPostgres,
    CatalogPostgres,
    BusinessPostgres,
    MemoryViewCache,
    NotificationDispatcher,
>;
pub type Availability =
    AvailabilityUseCase<BookingPostgres, CatalogPostgres, MemoryViewCache, NotificationDispatcher>;
pub type BookingPayments =
    BookingPaymentUseCase<BookingPostgres, MemoryViewCache, NotificationDispatcher, StripeClient>;
pub type PlanLimits = PlanLimitUseCase<BusinessPostgres>;

/// Process-wide collaborators every router wires its use cases from.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<DotEnvyConfig>,
    pub db_pool: Arc<PgPoolSquad>,
    pub side_effects: Arc<SideEffects>,
    pub stripe: Arc<StripeClient>,
}

impl Collaborators {
    pub fn bookings(&self) -> Bookings {
        BookingUseCase::new(
            Arc::new(BookingPostgres::new(Arc::clone(&self.db_pool))),
            Arc::new(CatalogPostgres::new(Arc::clone(&self.db_pool))),
            Arc::new(BusinessPostgres::new(Arc::clone(&self.db_pool))),
            Arc::clone(&self.side_effects),
            BookingPolicy {
                enforce_monthly_limit: self.config.scheduling.enforce_monthly_booking_limit,
            },
        )
    }

    pub fn availability(&self) -> Availability {
        AvailabilityUseCase::new(
            Arc::new(BookingPostgres::new(Arc::clone(&self.db_pool))),
            Arc::new(CatalogPostgres::new(Arc::clone(&self.db_pool))),
            Arc::clone(&self.side_effects),
            self.config.scheduling.business_hours,
        )
    }

    pub fn booking_payments(&self) -> BookingPayments {
        BookingPaymentUseCase::new(
            Arc::new(BookingPostgres::new(Arc::clone(&self.db_pool))),
            Arc::clone(&self.side_effects),
            Arc::clone(&self.stripe),
        )
    }

    pub fn plan_limits(&self) -> PlanLimits {
        PlanLimitUseCase::new(Arc::new(BusinessPostgres::new(Arc::clone(&self.db_pool))))
    }
}
