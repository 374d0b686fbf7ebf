pub mod booking_state;
pub mod bookings;
pub mod enums;
pub mod iam;
pub mod notifications;
pub mod plans;
pub mod resource_scope;
pub mod time_grid;
pub mod view_cache;
