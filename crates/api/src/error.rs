//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::BadRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::PaymentDeclined(_) => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
        CheckoutError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::PaymentGatewayUnavailable(_) | CheckoutError::SupplierUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        CheckoutError::SupplierRejected(_) | CheckoutError::UpstreamLookupFailed(_) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        CheckoutError::Store(_) | CheckoutError::TaskFailed(_) => {
            tracing::error!(error = %err, "checkout infrastructure error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_errors_map_to_statuses() {
        assert_eq!(
            status_of(CheckoutError::PaymentDeclined("card declined".to_string()).into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(CheckoutError::PaymentGatewayUnavailable("down".to_string()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(CheckoutError::SupplierRejected("out of stock".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CheckoutError::NotFound(OrderId::new(4)).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_plain_variants_map_to_statuses() {
        assert_eq!(
            status_of(ApiError::BadRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::NotFound("missing".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
