use serde::Serialize;
use thiserror::Error;

use crate::domain::value_objects::enums::{
    booking_statuses::BookingStatus, payment_statuses::PaymentStatus,
};

/// Booking lifecycle as two independent axes: scheduling status and payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingState {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

/// Everything that may move a booking between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    /// Staff writes a status directly.
    SetStatus(BookingStatus),
    /// Staff writes a payment status directly.
    SetPaymentStatus(PaymentStatus),
    Cancel,
    /// Gateway checkout (payment mode) completed.
    CheckoutCompleted,
    /// Gateway payment intent succeeded (staff-initiated, in person).
    PaymentSucceeded,
    PaymentFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAnomaly {
    /// Money arrived for a booking that no longer holds its slot.
    PaidWhileReleased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BookingState,
    pub to: BookingState,
    pub anomaly: Option<TransitionAnomaly>,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    pub fn status_changed(&self) -> bool {
        self.from.status != self.to.status
    }

    pub fn payment_changed(&self) -> bool {
        self.from.payment_status != self.to.payment_status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("booking is already cancelled")]
    AlreadyCancelled,
    #[error("illegal status transition {from} -> {to}")]
    IllegalStatus {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("illegal payment status transition {from} -> {to}")]
    IllegalPayment {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// Status table. Rewriting the current value is always accepted as a no-op.
pub fn status_transition_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;

    from == to
        || matches!(
            (from, to),
            (Pending, Confirmed | Cancelled | NoShow) | (Confirmed, Completed | Cancelled | NoShow)
        )
}

/// Payment table. Rewriting the current value is always accepted as a no-op.
pub fn payment_transition_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    use PaymentStatus::*;

    from == to
        || matches!(
            (from, to),
            (Pending, Paid | Failed) | (Failed, Pending | Paid) | (Paid, Refunded)
        )
}

impl BookingState {
    pub const INITIAL: BookingState = BookingState {
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
    };

    pub fn new(status: BookingStatus, payment_status: PaymentStatus) -> Self {
        Self {
            status,
            payment_status,
        }
    }

    pub fn apply(self, event: BookingEvent) -> Result<Transition, TransitionError> {
        let mut next = self;
        let mut anomaly = None;

        match event {
            BookingEvent::SetStatus(to) => {
                next.status = self.checked_status(to)?;
            }
            BookingEvent::SetPaymentStatus(to) => {
                next.payment_status = self.checked_payment(to)?;
            }
            BookingEvent::Cancel => {
                if self.status == BookingStatus::Cancelled {
                    return Err(TransitionError::AlreadyCancelled);
                }
                next.status = self.checked_status(BookingStatus::Cancelled)?;
            }
            BookingEvent::CheckoutCompleted => {
                next.payment_status = self.checked_payment(PaymentStatus::Paid)?;
                if self.status == BookingStatus::Pending {
                    next.status = BookingStatus::Confirmed;
                } else if !self.status.holds_slot() {
                    anomaly = Some(TransitionAnomaly::PaidWhileReleased);
                }
            }
            BookingEvent::PaymentSucceeded => {
                next.payment_status = self.checked_payment(PaymentStatus::Paid)?;
                if !self.status.holds_slot() {
                    anomaly = Some(TransitionAnomaly::PaidWhileReleased);
                }
            }
            BookingEvent::PaymentFailed => {
                next.payment_status = self.checked_payment(PaymentStatus::Failed)?;
            }
        }

        Ok(Transition {
            from: self,
            to: next,
            anomaly,
        })
    }

    fn checked_status(&self, to: BookingStatus) -> Result<BookingStatus, TransitionError> {
        if status_transition_allowed(self.status, to) {
            Ok(to)
        } else {
            Err(TransitionError::IllegalStatus {
                from: self.status,
                to,
            })
        }
    }

    fn checked_payment(&self, to: PaymentStatus) -> Result<PaymentStatus, TransitionError> {
        if payment_transition_allowed(self.payment_status, to) {
            Ok(to)
        } else {
            Err(TransitionError::IllegalPayment {
                from: self.payment_status,
                to,
            })
        }
    }
}
