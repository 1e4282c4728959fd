use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    PaymentNotAuthorized(String),
    #[error("failed to save order item {item_name}: {reason}")]
    ItemPersistFailed { item_name: String, reason: String },
    #[error("failed to save order")]
    PersistFailed(#[source] StoreError),
    #[error("invalid payment signature")]
    SignatureInvalid,
    #[error("could not mint a unique order number after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
}

impl OrderError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        OrderError::InvalidRequest(reason.into())
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ItemInsert { item_name, reason } => {
                OrderError::ItemPersistFailed { item_name, reason }
            }
            other => OrderError::PersistFailed(other),
        }
    }
}
