pub mod bookings;
pub mod businesses;
pub mod catalog;
pub mod notifications;
pub mod view_cache;
