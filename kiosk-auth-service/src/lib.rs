use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod error;
pub mod models;
pub mod password;
pub mod schema;
pub mod service;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use service::{AuthService, NewAdmin};
pub use store::{AdminStore, AdminStoreError, PgAdminStore};
pub use token::{IssuedToken, TokenService};

pub type DbPool = Pool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
