pub mod bookings;
pub mod businesses;
pub mod clients;
pub mod payment_events;
pub mod services;
