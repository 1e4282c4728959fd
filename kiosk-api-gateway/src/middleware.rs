use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The admin a request was authenticated as. Inserted as a request
/// extension by [`require_admin`].
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub id: Uuid,
    pub username: String,
}

impl AuthenticatedAdmin {
    /// Recorded against order status changes made by this admin.
    pub fn audit_source(&self) -> String {
        format!("admin:{}", self.username)
    }
}

fn bearer_token(request: &Request) -> Result<String, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("No authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)?;
    let admin = state.auth.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedAdmin {
        id: admin.id,
        username: admin.username,
    });
    Ok(next.run(request).await)
}
