//! API Error Mapping
//!
//! Central error type for the REST surface, mapped to HTTP status codes and
//! a uniform JSON error body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::ledger::LedgerError;

/// Errors surfaced by the REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested holding does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is structurally valid but cannot be satisfied.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The store failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::AlreadyExists(_) | LedgerError::InsufficientQuantity { .. } => {
                Self::InvalidRequest(err.to_string())
            }
            LedgerError::Store(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            Self::InvalidRequest(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg, "INVALID_REQUEST")
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("holding not found: AAPL".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_request_maps_to_422() {
        let response = ApiError::InvalidRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_maps_to_500() {
        let response = ApiError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn ledger_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(LedgerError::NotFound("AAPL".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(LedgerError::InsufficientQuantity {
                ticker: "AAPL".to_string(),
                held: 3,
                requested: 5,
            }),
            ApiError::InvalidRequest(_)
        ));
        assert!(matches!(
            ApiError::from(LedgerError::Store("oops".to_string())),
            ApiError::Internal(_)
        ));
    }
}
