use thiserror::Error;

use crate::store::AdminStoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Admin account no longer exists")]
    UnknownAdmin,
    #[error("{0}")]
    Conflict(String),
    #[error("failed to hash password")]
    Hashing(password_hash::Error),
    #[error("failed to issue token")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("admin store failure")]
    Store(#[source] AdminStoreError),
}

impl From<AdminStoreError> for AuthError {
    fn from(err: AdminStoreError) -> Self {
        match err {
            AdminStoreError::Duplicate(field) => {
                AuthError::Conflict(format!("An admin with this {field} already exists"))
            }
            other => AuthError::Store(other),
        }
    }
}
