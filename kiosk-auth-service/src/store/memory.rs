use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{AdminStore, AdminStoreError};
use crate::models::Admin;

#[derive(Default)]
pub struct InMemoryAdminStore {
    admins: Mutex<Vec<Admin>>,
}

impl InMemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, id: Uuid) {
        self.admins().retain(|admin| admin.id != id);
    }

    fn admins(&self) -> MutexGuard<'_, Vec<Admin>> {
        self.admins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AdminStore for InMemoryAdminStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, AdminStoreError> {
        Ok(self
            .admins()
            .iter()
            .find(|admin| admin.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AdminStoreError> {
        Ok(self
            .admins()
            .iter()
            .find(|admin| admin.id == id)
            .cloned())
    }

    async fn insert(&self, admin: &Admin) -> Result<(), AdminStoreError> {
        let mut admins = self.admins();
        if admins.iter().any(|a| a.username == admin.username) {
            return Err(AdminStoreError::Duplicate("username"));
        }
        if admins.iter().any(|a| a.email == admin.email) {
            return Err(AdminStoreError::Duplicate("email"));
        }
        admins.push(admin.clone());
        Ok(())
    }
}
