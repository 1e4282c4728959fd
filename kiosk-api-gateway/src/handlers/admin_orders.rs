use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json,
    routing::{get, put},
};
use kiosk_order_service::models::OrderStatus;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::middleware::AuthenticatedAdmin;
use crate::models::*;
use crate::state::AppState;

use super::JsonBody;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{order_number}/status", put(update_order_status))
        .route("/admin/orders/{order_number}/history", get(order_history))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    responses(
        (status = 200, description = "All orders, newest first", body = Vec<AdminOrder>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<AdminOrder>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{order_number}/status",
    params(
        ("order_number" = String, Path, description = "Public order number")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UpdateOrderStatusResponse),
        (status = 400, description = "Unknown status", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(order_number): Path<String>,
    JsonBody(payload): JsonBody<UpdateOrderStatusRequest>,
) -> Result<Json<UpdateOrderStatusResponse>, ApiError> {
    let status: OrderStatus = payload
        .status
        .ok_or_else(|| ApiError::InvalidRequest("status is required".to_string()))?
        .parse()?;

    let order = state
        .orders
        .set_status(&order_number, status, &admin.audit_source())
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    info!(%order_number, %status, admin = %admin.username, "order status set");

    Ok(Json(UpdateOrderStatusResponse {
        order_number: order.order_number,
        status: order.status.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{order_number}/history",
    params(
        ("order_number" = String, Path, description = "Public order number")
    ),
    responses(
        (status = 200, description = "Status changes, oldest first", body = Vec<StatusChangeResponse>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn order_history(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<Vec<StatusChangeResponse>>, ApiError> {
    if state.orders.find_order(&order_number).await?.is_none() {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }
    let changes = state.orders.status_history(&order_number).await?;
    Ok(Json(changes.into_iter().map(Into::into).collect()))
}
