use axum::http::StatusCode;
use crates::domain::value_objects::{
    booking_state::TransitionError, bookings::SlotConflict, enums::resource_kinds::ResourceKind,
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("slot unavailable: overlaps an existing booking")]
    SlotUnavailable(SlotConflict),
    #[error("plan limit reached for {resource}: {current} of {limit} used")]
    PlanLimit {
        resource: ResourceKind,
        limit: i64,
        current: i64,
    },
    #[error("monthly booking limit reached: {current} of {limit} used")]
    MonthlyBookingLimit { limit: i64, current: i64 },
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    InvalidTransition(TransitionError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TransitionError> for BookingError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyCancelled => BookingError::InvalidState(err.to_string()),
            other => BookingError::InvalidTransition(other),
        }
    }
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::SlotUnavailable(_)
            | BookingError::InvalidState(_)
            | BookingError::InvalidTransition(_)
            | BookingError::Validation(_)
            | BookingError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            BookingError::PlanLimit { .. }
            | BookingError::MonthlyBookingLimit { .. }
            | BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::NotFound(_) => "not_found",
            BookingError::SlotUnavailable(_) => "slot_unavailable",
            BookingError::PlanLimit { .. } => "plan_limit",
            BookingError::MonthlyBookingLimit { .. } => "monthly_booking_limit",
            BookingError::InvalidState(_) => "invalid_state",
            BookingError::InvalidTransition(_) => "invalid_transition",
            BookingError::Validation(_) => "validation_error",
            BookingError::Forbidden(_) => "forbidden",
            BookingError::InvalidWebhook(_) => "invalid_webhook",
            BookingError::Internal(_) => "internal_error",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            BookingError::NotFound(entity) => Some(json!({ "entity": entity })),
            BookingError::SlotUnavailable(conflict) => Some(json!({
                "start_time": conflict.start_time,
                "end_time": conflict.end_time,
            })),
            BookingError::PlanLimit {
                resource,
                limit,
                current,
            } => Some(json!({ "resource": resource, "limit": limit, "current": current })),
            BookingError::MonthlyBookingLimit { limit, current } => {
                Some(json!({ "limit": limit, "current": current }))
            }
            BookingError::InvalidTransition(TransitionError::IllegalStatus { from, to }) => {
                Some(json!({ "field": "status", "from": from, "to": to }))
            }
            BookingError::InvalidTransition(TransitionError::IllegalPayment { from, to }) => {
                Some(json!({ "field": "payment_status", "from": from, "to": to }))
            }
            _ => None,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BookingError>;
