use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Admin;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryAdminStore;
pub use postgres::PgAdminStore;

#[derive(Error, Debug)]
pub enum AdminStoreError {
    #[error("{0} already taken")]
    Duplicate(&'static str),
    #[error("error while executing database query")]
    Query(#[from] diesel::result::Error),
    #[error("database connection unavailable: {0}")]
    Pool(String),
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, AdminStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AdminStoreError>;

    /// Fails with `Duplicate` naming the clashing field.
    async fn insert(&self, admin: &Admin) -> Result<(), AdminStoreError>;
}
