use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    NewOrder, NewOrderItem, Order, OrderDetails, OrderStatus, OrderStatusChange, PaymentApplied,
};

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("order number {0} is already taken")]
    DuplicateOrderNumber(String),
    #[error("failed to insert order item {item_name}: {reason}")]
    ItemInsert { item_name: String, reason: String },
    #[error("error while executing database query")]
    Query(#[from] diesel::result::Error),
    #[error("database connection unavailable: {0}")]
    Pool(String),
}

/// Durable record of orders, their items and their status history.
///
/// Every mutating method is one transaction: it either fully applies or
/// leaves the store untouched.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order_number_exists(&self, order_number: &str) -> Result<bool, StoreError>;

    /// Inserts the order, every item and the creation entry of the status
    /// history as one unit.
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        source: &str,
    ) -> Result<OrderDetails, StoreError>;

    async fn find_order(&self, order_number: &str) -> Result<Option<OrderDetails>, StoreError>;

    /// Marks the order paid and overwrites its total with the settled amount.
    /// Returns `None` when no order carries this number.
    async fn apply_payment(
        &self,
        order_number: &str,
        amount: &BigDecimal,
        source: &str,
    ) -> Result<Option<PaymentApplied>, StoreError>;

    async fn set_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        source: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderDetails>, StoreError>;

    async fn list_orders_since(&self, since: DateTime<Utc>)
        -> Result<Vec<OrderDetails>, StoreError>;

    async fn status_history(&self, order_number: &str)
        -> Result<Vec<OrderStatusChange>, StoreError>;
}
