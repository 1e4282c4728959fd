use std::collections::BTreeMap;

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    response::Json,
    routing::post,
};
use bigdecimal::{BigDecimal, Zero};
use kiosk_order_service::money::has_currency_precision;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

use super::JsonBody;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payfast-payment", post(payfast_payment))
        .route("/payment/notify", post(payment_notify))
}

fn positive_amount(amount: Option<BigDecimal>) -> Result<BigDecimal, ApiError> {
    match amount {
        Some(amount) if amount <= BigDecimal::zero() => Err(ApiError::InvalidRequest(
            "Amount must be greater than zero".to_string(),
        )),
        Some(amount) if !has_currency_precision(&amount) => Err(ApiError::InvalidRequest(
            "Amount must have at most two decimal places".to_string(),
        )),
        Some(amount) => Ok(amount),
        None => Err(ApiError::InvalidRequest("Amount is required".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/api/create-payment-intent",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Missing or non-positive amount", body = ApiErrorResponse),
        (status = 502, description = "Payment provider failed", body = ApiErrorResponse),
    ),
    tag = "payments"
)]
#[instrument(skip(state))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let amount = positive_amount(payload.amount)?;
    let intent = state.intents.create_intent(&amount).await?;
    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

#[utoipa::path(
    post,
    path = "/api/payfast-payment",
    request_body = PayfastPaymentRequest,
    responses(
        (status = 200, description = "Signed fields for the hosted payment page", body = BTreeMap<String, String>),
        (status = 400, description = "Missing amount or base_url", body = ApiErrorResponse),
        (status = 500, description = "Order could not be reserved", body = ApiErrorResponse),
    ),
    tag = "payments"
)]
#[instrument(skip(state, payload))]
pub async fn payfast_payment(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PayfastPaymentRequest>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let amount = positive_amount(payload.amount)?;
    let base_url = payload
        .base_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("base_url is required".to_string()))?;

    let items = payload
        .items
        .unwrap_or_default()
        .into_iter()
        .map(Into::into)
        .collect();
    let order_number = state
        .checkout
        .reserve_order(&amount, items, payload.email, payload.phone)
        .await?;

    let fields = state
        .payfast
        .build_redirect_payment(&amount, &base_url, &order_number);
    info!(%order_number, "redirect payment prepared");
    Ok(Json(fields))
}

/// Settlement callback from the payment provider. Acknowledged with a plain
/// `OK` unless the callback is forged or malformed.
#[utoipa::path(
    post,
    path = "/api/payment/notify",
    request_body(content = BTreeMap<String, String>, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Callback acknowledged", body = String, content_type = "text/plain"),
        (status = 400, description = "Invalid signature or malformed callback", body = ApiErrorResponse),
    ),
    tag = "payments"
)]
#[instrument(skip(state, form))]
pub async fn payment_notify(
    State(state): State<AppState>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Result<&'static str, ApiError> {
    let Form(fields) = form.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let outcome = state.callbacks.handle(&fields).await?;
    info!(?outcome, "payment callback handled");
    Ok("OK")
}
