use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
};
use kiosk_menu_service::MenuItemDraft;
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

use super::JsonBody;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/menu-items", get(list_menu_items))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/menu-items",
            get(list_all_menu_items).post(create_menu_item),
        )
        .route(
            "/admin/menu-items/{id}",
            put(update_menu_item).delete(delete_menu_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/menu-items",
    params(MenuQuery),
    responses(
        (status = 200, description = "Available menu items", body = Vec<MenuItemResponse>),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let items = state
        .menu
        .list_items(query.category.as_deref(), true)
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/menu-items",
    params(MenuQuery),
    responses(
        (status = 200, description = "All menu items, including unavailable ones", body = Vec<MenuItemResponse>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_all_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let items = state
        .menu
        .list_items(query.category.as_deref(), false)
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/menu-items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = CreatedResponse),
        (status = 400, description = "Missing or invalid field", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state, payload))]
pub async fn create_menu_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let draft = MenuItemDraft::try_from(payload)?;
    let created = state.menu.create_item(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: created.item.id,
            message: "Menu item created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item id")
    ),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = MenuItemResponse),
        (status = 400, description = "Invalid field", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state, payload))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    JsonBody(payload): JsonBody<UpdateMenuItemRequest>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let updated = state.menu.update_item(id, payload.into()).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item id")
    ),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.menu.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
