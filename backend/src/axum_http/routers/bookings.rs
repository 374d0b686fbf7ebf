use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::value_objects::bookings::{
    BookingListFilter, CreateBookingModel, UpdateBookingModel,
};
use uuid::Uuid;

use super::{BookingPayments, Bookings, Collaborators};
use crate::{auth::AuthActor, usecases::errors::BookingError};

#[derive(Clone)]
pub struct BookingRouteState {
    bookings: Arc<Bookings>,
    payments: Arc<BookingPayments>,
}

pub fn routes(collaborators: &Collaborators) -> Router {
    let state = BookingRouteState {
        bookings: Arc::new(collaborators.bookings()),
        payments: Arc::new(collaborators.booking_payments()),
    };

    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/summary", get(booking_summary))
        .route(
            "/:booking_id",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/:booking_id/cancel", post(cancel_booking))
        .route("/:booking_id/payment-intent", post(create_payment_intent))
        .with_state(state)
}

pub async fn list_bookings(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Query(filter): Query<BookingListFilter>,
) -> Result<impl IntoResponse, BookingError> {
    let bookings = state.bookings.list_bookings(actor, filter).await?;
    Ok(Json(bookings))
}

pub async fn create_booking(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Json(model): Json<CreateBookingModel>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.create_booking(actor, model).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn booking_summary(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
) -> Result<impl IntoResponse, BookingError> {
    let summary = state.bookings.booking_summary(actor).await?;
    Ok(Json(summary))
}

pub async fn get_booking(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get_booking(actor, booking_id).await?;
    Ok(Json(booking))
}

pub async fn update_booking(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Path(booking_id): Path<Uuid>,
    Json(patch): Json<UpdateBookingModel>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state
        .bookings
        .update_booking(actor, booking_id, patch)
        .await?;
    Ok(Json(booking))
}

pub async fn delete_booking(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    state.bookings.delete_booking(actor, booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_booking(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.cancel_booking(actor, booking_id).await?;
    Ok(Json(booking))
}

pub async fn create_payment_intent(
    State(state): State<BookingRouteState>,
    AuthActor(actor): AuthActor,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let intent = state
        .payments
        .create_payment_intent(actor, booking_id)
        .await?;
    Ok((StatusCode::CREATED, Json(intent)))
}
