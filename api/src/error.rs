//! API error type and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use souk_market::MarketError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Malformed request: unreadable body, bad query value.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Route exists but is switched off.
    #[error("not found")]
    RouteDisabled,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::RouteDisabled => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Market(e) => match e {
                MarketError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                MarketError::InvalidWallet(_) => (StatusCode::BAD_REQUEST, "INVALID_WALLET"),
                MarketError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                MarketError::PaymentNotVerified => {
                    (StatusCode::PAYMENT_REQUIRED, "PAYMENT_NOT_VERIFIED")
                }
                MarketError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                MarketError::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
                MarketError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                MarketError::NotPurchasable(_) => (StatusCode::CONFLICT, "NOT_PURCHASABLE"),
                MarketError::DuplicatePayment(_) => (StatusCode::CONFLICT, "DUPLICATE_PAYMENT"),
                MarketError::DuplicateReport => (StatusCode::CONFLICT, "DUPLICATE_REPORT"),
                MarketError::InvalidTransition(_) => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION")
                }
                MarketError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                MarketError::Oracle(_) => (StatusCode::BAD_GATEWAY, "PAYMENT_NETWORK_ERROR"),
                MarketError::StoreUnavailable(_)
                | MarketError::Crypto(_)
                | MarketError::Config(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use souk_types::ListingStatus;

    fn status(e: impl Into<ApiError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn market_errors_map_to_statuses() {
        assert_eq!(status(MarketError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(MarketError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(MarketError::PaymentNotVerified), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status(MarketError::AccessDenied("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status(MarketError::NotPurchasable(ListingStatus::Pulled)),
            StatusCode::CONFLICT
        );
        assert_eq!(status(MarketError::DuplicateReport), StatusCode::CONFLICT);
        assert_eq!(status(ApiError::RouteDisabled), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failures_hide_detail() {
        let response =
            ApiError::from(MarketError::StoreUnavailable("mdb_put: MDB_MAP_FULL".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
