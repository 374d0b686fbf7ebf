pub mod availability;
pub mod booking_payments;
pub mod bookings;
pub mod errors;
pub mod plan_limits;
pub mod side_effects;

#[cfg(test)]
pub mod test_support;
