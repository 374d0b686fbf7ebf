pub mod actor_roles;
pub mod booking_statuses;
pub mod payment_statuses;
pub mod plan_tiers;
pub mod resource_kinds;
