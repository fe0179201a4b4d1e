//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout or reconciliation error.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    let status = match &err {
        FulfillmentError::Validation(_) | FulfillmentError::Domain(_) => StatusCode::BAD_REQUEST,
        FulfillmentError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::InsufficientStock { .. } => StatusCode::CONFLICT,
        FulfillmentError::ItemNotFound(_) | FulfillmentError::OrderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        FulfillmentError::Gateway(_) => StatusCode::BAD_GATEWAY,
        FulfillmentError::UnknownAuthorization(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FulfillmentError::LockBackend(_)
        | FulfillmentError::Interrupted
        | FulfillmentError::Publish(_)
        | FulfillmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }

    (status, err.to_string())
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        ApiError::Fulfillment(err.into())
    }
}
