use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use chrono::Utc;
use kiosk_order_service::analytics::{Timeframe, build_report};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/analytics", get(get_analytics))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Sales report for the window", body = AnalyticsResponse),
        (status = 400, description = "Unknown timeframe", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let timeframe = match query.timeframe.as_deref() {
        Some(raw) => raw.parse::<Timeframe>()?,
        None => Timeframe::default(),
    };
    let report = build_report(&*state.orders, timeframe, Utc::now()).await?;
    Ok(Json(report.into()))
}
