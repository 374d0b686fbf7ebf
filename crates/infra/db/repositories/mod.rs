pub mod bookings;
pub mod businesses;
pub mod catalog;
