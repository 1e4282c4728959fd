use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::{AdminStore, AdminStoreError};
use crate::models::Admin;
use crate::schema::admins;
use crate::DbPool;

#[derive(Clone)]
pub struct PgAdminStore {
    pool: DbPool,
}

impl PgAdminStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn classify_insert(err: DieselError) -> AdminStoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some("admins_email_key") => AdminStoreError::Duplicate("email"),
                _ => AdminStoreError::Duplicate("username"),
            }
        }
        _ => AdminStoreError::Query(err),
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, AdminStoreError> {
        let mut obj = self
            .pool
            .get()
            .await
            .map_err(|e| AdminStoreError::Pool(e.to_string()))?;
        let conn: &mut AsyncPgConnection = &mut obj;
        Ok(admins::table
            .filter(admins::username.eq(username))
            .select(Admin::as_select())
            .first(conn)
            .await
            .optional()?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AdminStoreError> {
        let mut obj = self
            .pool
            .get()
            .await
            .map_err(|e| AdminStoreError::Pool(e.to_string()))?;
        let conn: &mut AsyncPgConnection = &mut obj;
        Ok(admins::table
            .find(id)
            .select(Admin::as_select())
            .first(conn)
            .await
            .optional()?)
    }

    async fn insert(&self, admin: &Admin) -> Result<(), AdminStoreError> {
        let mut obj = self
            .pool
            .get()
            .await
            .map_err(|e| AdminStoreError::Pool(e.to_string()))?;
        let conn: &mut AsyncPgConnection = &mut obj;
        diesel::insert_into(admins::table)
            .values(admin)
            .execute(conn)
            .await
            .map_err(classify_insert)?;
        Ok(())
    }
}
