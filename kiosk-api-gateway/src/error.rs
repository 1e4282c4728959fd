use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::Json};
use kiosk_auth_service::AuthError;
use kiosk_menu_service::MenuError;
use kiosk_order_service::analytics::UnknownTimeframe;
use kiosk_order_service::models::UnknownOrderStatus;
use kiosk_order_service::payments::PaymentError;
use kiosk_order_service::{OrderError, StoreError};
use tracing::error;

use crate::models::ApiErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    PaymentNotAuthorized(String),
    #[error("Failed to add item {0} to order")]
    ItemPersistFailed(String),
    #[error("Failed to save order to database")]
    PersistFailed,
    #[error("Invalid signature")]
    SignatureInvalid,
    #[error("{0}")]
    NotFound(String),
    #[error("Could not generate a unique order number")]
    GenerationExhausted,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Failed to create payment intent")]
    PaymentProviderFailed,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::PaymentNotAuthorized(_) => "PAYMENT_NOT_AUTHORIZED",
            ApiError::ItemPersistFailed(_) => "ITEM_PERSIST_FAILED",
            ApiError::PersistFailed => "PERSIST_FAILED",
            ApiError::SignatureInvalid => "SIGNATURE_INVALID",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::GenerationExhausted => "GENERATION_EXHAUSTED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PaymentProviderFailed => "PAYMENT_PROVIDER_FAILED",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::PaymentNotAuthorized(_)
            | ApiError::SignatureInvalid => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PaymentProviderFailed => StatusCode::BAD_GATEWAY,
            ApiError::ItemPersistFailed(_)
            | ApiError::PersistFailed
            | ApiError::GenerationExhausted
            | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ApiErrorResponse {
            success: false,
            code: self.code().to_string(),
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidRequest(reason) => ApiError::InvalidRequest(reason),
            OrderError::PaymentNotAuthorized(reason) => ApiError::PaymentNotAuthorized(reason),
            OrderError::ItemPersistFailed { item_name, reason } => {
                error!(%item_name, %reason, "order rolled back");
                ApiError::ItemPersistFailed(item_name)
            }
            OrderError::PersistFailed(source) => {
                error!(error = ?source, "order rolled back");
                ApiError::PersistFailed
            }
            OrderError::SignatureInvalid => ApiError::SignatureInvalid,
            OrderError::GenerationExhausted { attempts } => {
                error!(attempts, "order number generation exhausted");
                ApiError::GenerationExhausted
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = ?err, "order store failure");
        ApiError::Internal
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidAmount => {
                ApiError::InvalidRequest("Amount must be greater than zero".to_string())
            }
            other => {
                error!(error = ?other, "payment provider failure");
                ApiError::PaymentProviderFailed
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidRequest(reason) => ApiError::InvalidRequest(reason),
            AuthError::Conflict(reason) => ApiError::Conflict(reason),
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::UnknownAdmin => {
                ApiError::Unauthorized(err.to_string())
            }
            other => {
                error!(error = ?other, "auth failure");
                ApiError::Internal
            }
        }
    }
}

impl From<MenuError> for ApiError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::InvalidRequest(reason) => ApiError::InvalidRequest(reason),
            MenuError::NotFound(_) => ApiError::NotFound(err.to_string()),
            MenuError::Conflict(reason) => ApiError::Conflict(reason),
            other => {
                error!(error = ?other, "menu store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<UnknownTimeframe> for ApiError {
    fn from(err: UnknownTimeframe) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl From<UnknownOrderStatus> for ApiError {
    fn from(err: UnknownOrderStatus) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
