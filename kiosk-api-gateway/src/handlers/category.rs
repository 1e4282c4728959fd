use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

use super::JsonBody;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryResponse>),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.menu.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Missing name", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 409, description = "Category name already exists", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn create_category(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.menu.create_category(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category id")
    ),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Category not found", body = ApiErrorResponse),
        (status = 409, description = "Category name already exists", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(payload): JsonBody<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.menu.update_category(id, payload.into()).await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Category not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.menu.delete_category(id).await?;
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}
