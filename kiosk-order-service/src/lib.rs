use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod analytics;
pub mod completion;
pub mod error;
pub mod models;
pub mod money;
pub mod notify;
pub mod order_number;
pub mod payfast;
pub mod payment_notification;
pub mod payments;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use completion::{CompletedOrder, OrderCompletionService, OrderItemSubmission, OrderSubmission};
pub use error::OrderError;
pub use payment_notification::{CallbackOutcome, PaymentNotificationHandler};
pub use store::{OrderStore, PgOrderStore, StoreError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type DbPool = Pool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub fn establish_pool(database_url: &str, max_size: usize) -> Result<DbPool, BoxError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(manager).max_size(max_size).build()?)
}
