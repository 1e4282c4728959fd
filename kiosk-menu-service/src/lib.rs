use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod draft;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;

pub use draft::{CategoryDraft, MenuItemDraft, MenuItemPatch, PieceOptionDraft, PricedOption};
pub use error::MenuError;
pub use store::PgMenuStore;

pub type DbPool = Pool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
