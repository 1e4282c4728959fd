use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Admin;
use crate::password::{hash_password, verify_password};
use crate::store::AdminStore;
use crate::token::{IssuedToken, TokenService};

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    store: Arc<dyn AdminStore>,
    tokens: TokenService,
}

fn required(value: &str, field: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::InvalidRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl AuthService {
    pub fn new(store: Arc<dyn AdminStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidRequest(
                "Username and password are required".to_string(),
            ));
        }

        let admin = self.store.find_by_username(username.trim()).await?;
        match admin {
            Some(admin) if verify_password(password, &admin.password_hash) => {
                info!(admin_id = %admin.id, "admin logged in");
                self.tokens.issue(admin.id)
            }
            _ => {
                warn!(username, "failed admin login");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn create_admin(&self, request: NewAdmin) -> Result<Admin, AuthError> {
        let username = required(&request.username, "username")?;
        let email = required(&request.email, "email")?;
        if request.password.is_empty() {
            return Err(AuthError::InvalidRequest("password is required".to_string()));
        }

        let admin = Admin {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: hash_password(&request.password).map_err(AuthError::Hashing)?,
            created_at: Utc::now(),
        };
        self.store.insert(&admin).await?;
        info!(admin_id = %admin.id, username = %admin.username, "admin created");
        Ok(admin)
    }

    /// Resolves a bearer token to the admin it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Admin, AuthError> {
        let admin_id = self.tokens.verify(token)?;
        self.store
            .find_by_id(admin_id)
            .await?
            .ok_or(AuthError::UnknownAdmin)
    }
}
