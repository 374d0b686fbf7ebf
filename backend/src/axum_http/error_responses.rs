use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::usecases::errors::BookingError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details) = match &self {
            BookingError::Internal(err) => {
                error!(status = status.as_u16(), internal_error = ?err, "http: request failed");
                // Don't leak internal error detail to client
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), other.details()),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: self.error_code(),
            message,
            details,
        });

        (status, body).into_response()
    }
}
