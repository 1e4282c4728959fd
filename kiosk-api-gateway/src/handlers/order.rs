use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/complete-order", post(complete_order))
        .route("/order-status/{order_number}", get(get_order_status))
}

/// An empty body and a literal `null` both mean no payload was sent.
fn checkout_payload(body: &[u8]) -> Result<Option<CompleteOrderRequest>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {e}")))
}

#[utoipa::path(
    post,
    path = "/api/complete-order",
    request_body = CompleteOrderRequest,
    responses(
        (status = 200, description = "Order stored", body = CompleteOrderResponse),
        (status = 400, description = "Validation failed", body = ApiErrorResponse),
        (status = 500, description = "Order could not be stored", body = ApiErrorResponse),
    ),
    tag = "orders"
)]
#[instrument(skip(state, body))]
pub async fn complete_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CompleteOrderResponse>, ApiError> {
    let submission = checkout_payload(&body)?.map(Into::into);
    let completed = state.checkout.complete_order(submission).await?;

    let notification_errors =
        (!completed.notification_errors.is_empty()).then_some(completed.notification_errors);
    Ok(Json(CompleteOrderResponse {
        success: true,
        order_number: completed.order_number,
        notification_errors,
    }))
}

#[utoipa::path(
    get,
    path = "/api/order-status/{order_number}",
    params(
        ("order_number" = String, Path, description = "Public 8-character order number")
    ),
    responses(
        (status = 200, description = "Current order status", body = OrderStatusResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    tag = "orders"
)]
#[instrument(skip(state))]
pub async fn get_order_status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let details = state
        .orders
        .find_order(&order_number)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(details.order.into()))
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;

    #[test]
    fn empty_and_null_bodies_carry_no_payload() {
        assert!(checkout_payload(b"").unwrap().is_none());
        assert!(checkout_payload(b"  \n").unwrap().is_none());
        assert!(checkout_payload(b"null").unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = checkout_payload(b"{\"items\": [").unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[test]
    fn parses_checkout_fields() {
        let payload = checkout_payload(
            br#"{"items":[{"name":"Burger","quantity":2,"price":50.0}],"amount":100.0,"paymentIntent":"pi_123"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(payload.payment_intent.as_deref(), Some("pi_123"));
        assert_eq!(payload.items.unwrap()[0].name.as_deref(), Some("Burger"));
        assert_eq!(payload.amount.unwrap(), BigDecimal::from(100));
    }
}
