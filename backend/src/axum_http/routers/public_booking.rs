use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use crates::domain::value_objects::bookings::{
    AvailabilityQuery, PublicBookingModel, PublicBookingResponse,
};
use uuid::Uuid;

use super::{Availability, BookingPayments, Bookings, Collaborators};
use crate::usecases::{availability::AvailabilityMode, errors::BookingError};

#[derive(Clone)]
pub struct PublicRouteState {
    availability: Arc<Availability>,
    bookings: Arc<Bookings>,
    payments: Arc<BookingPayments>,
}

pub fn routes(collaborators: &Collaborators) -> Router {
    let state = PublicRouteState {
        availability: Arc::new(collaborators.availability()),
        bookings: Arc::new(collaborators.bookings()),
        payments: Arc::new(collaborators.booking_payments()),
    };

    Router::new()
        .route("/:business_id/availability", get(public_availability))
        .route("/:business_id/bookings", post(public_booking))
        .with_state(state)
}

pub async fn public_availability(
    State(state): State<PublicRouteState>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let slots = state
        .availability
        .resolve(business_id, query, AvailabilityMode::Public { now: Utc::now() })
        .await?;
    Ok(Json(slots))
}

pub async fn public_booking(
    State(state): State<PublicRouteState>,
    Path(business_id): Path<Uuid>,
    Json(model): Json<PublicBookingModel>,
) -> Result<impl IntoResponse, BookingError> {
    let pay_online = model.pay_online;
    let email = model.client.email.trim().to_ascii_lowercase();

    let booking = state
        .bookings
        .create_public_booking(business_id, model, Utc::now())
        .await?;

    let checkout_url = if pay_online {
        state.payments.public_checkout_url(&booking, email).await
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        Json(PublicBookingResponse {
            booking,
            checkout_url,
        }),
    ))
}
