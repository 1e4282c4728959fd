use axum::{Router, extract::State, http::StatusCode, response::Json, routing::post};
use kiosk_auth_service::NewAdmin;
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

use super::JsonBody;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/admin/login", post(login))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/admin/create", post(create_admin))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ApiErrorResponse),
        (status = 401, description = "Invalid credentials", body = ApiErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = state
        .auth
        .login(
            payload.username.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(LoginResponse {
        token: token.access_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
        message: "Login successful".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/create",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = CreateAdminResponse),
        (status = 400, description = "Missing field", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 409, description = "Username or email already exists", body = ApiErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(skip(state, payload))]
pub async fn create_admin(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateAdminRequest>,
) -> Result<(StatusCode, Json<CreateAdminResponse>), ApiError> {
    let admin = state
        .auth
        .create_admin(NewAdmin {
            username: payload.username.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            id: admin.id,
            username: admin.username,
            email: admin.email,
            message: "Admin created successfully".to_string(),
        }),
    ))
}
