use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use crates::domain::value_objects::bookings::AvailabilityQuery;

use super::{Availability, Collaborators};
use crate::{
    auth::AuthActor,
    usecases::{availability::AvailabilityMode, errors::BookingError},
};

pub fn routes(collaborators: &Collaborators) -> Router {
    Router::new()
        .route("/", get(staff_availability))
        .with_state(Arc::new(collaborators.availability()))
}

/// Full day grid for the caller's tenant, past slots included.
pub async fn staff_availability(
    State(availability): State<Arc<Availability>>,
    AuthActor(actor): AuthActor,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, BookingError> {
    let slots = availability
        .resolve(actor.business_id, query, AvailabilityMode::Staff)
        .await?;
    Ok(Json(slots))
}
