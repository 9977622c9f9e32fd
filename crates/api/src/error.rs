//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payment::PaymentError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Order saga error.
    Saga(SagaError),
    /// Payment gateway error.
    Payment(PaymentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::OrderNotFound(_) | SagaError::BookNotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::InsufficientStock { .. } | SagaError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        SagaError::Consistency(_) => StatusCode::CONFLICT,
        SagaError::InventoryService(_)
        | SagaError::EventPublisher(_)
        | SagaError::Store(_)
        | SagaError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    let status = match &err {
        PaymentError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        PaymentError::Consistency(_) => StatusCode::CONFLICT,
        PaymentError::InvalidSignature
        | PaymentError::MissingParameter(_)
        | PaymentError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        PaymentError::InvalidKey | PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
