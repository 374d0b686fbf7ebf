use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};

use super::{BookingPayments, Collaborators};
use crate::usecases::errors::BookingError;

const STRIPE_SIGNATURE: &str = "stripe-signature";

pub fn routes(collaborators: &Collaborators) -> Router {
    Router::new()
        .route("/webhook", post(payment_webhook))
        .with_state(Arc::new(collaborators.booking_payments()))
}

/// Gateway callback. The raw body is needed for signature verification.
pub async fn payment_webhook(
    State(payments): State<Arc<BookingPayments>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BookingError> {
    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|value| value.to_str().ok());

    let outcome = payments.handle_webhook(&body, signature).await?;
    Ok(Json(outcome))
}
