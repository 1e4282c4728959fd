use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use super::{OrderStore, StoreError};
use crate::models::{
    NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderStatus, OrderStatusChange,
    PaymentApplied,
};

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    changes: Vec<OrderStatusChange>,
}

#[derive(Default)]
struct Faults {
    failing_item: Option<String>,
    unavailable: bool,
    hidden_numbers: HashSet<String>,
}

/// Order store kept in process memory, with switches for the failure modes
/// of a real database.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<State>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes inserting an item with this name fail.
    pub fn fail_item_named(&self, item_name: impl Into<String>) {
        lock(&self.faults).failing_item = Some(item_name.into());
    }

    /// Every call fails as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.faults).unavailable = unavailable;
    }

    /// Simulates another writer that took `order_number` between the
    /// existence check and the insert.
    pub fn claim_number_concurrently(&self, order_number: impl Into<String>) {
        lock(&self.faults).hidden_numbers.insert(order_number.into());
    }

    pub fn order_count(&self) -> usize {
        lock(&self.state).orders.len()
    }

    pub fn item_count(&self) -> usize {
        lock(&self.state).items.len()
    }

    /// Backdates an order, for report windows.
    pub fn set_created_at(&self, order_number: &str, created_at: DateTime<Utc>) {
        let mut state = lock(&self.state);
        if let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.order_number == order_number)
        {
            order.created_at = created_at;
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if lock(&self.faults).unavailable {
            return Err(StoreError::Pool("connection refused".to_string()));
        }
        Ok(())
    }
}

impl State {
    fn details(&self, order: &Order) -> OrderDetails {
        OrderDetails {
            order: order.clone(),
            items: self
                .items
                .iter()
                .filter(|item| item.order_id == order.id)
                .cloned()
                .collect(),
        }
    }

    fn record_change(
        &mut self,
        order_id: i32,
        from_status: Option<OrderStatus>,
        to_status: OrderStatus,
        source: &str,
    ) {
        let id = self.changes.len() as i32 + 1;
        self.changes.push(OrderStatusChange {
            id,
            order_id,
            from_status,
            to_status,
            source: source.to_string(),
            changed_at: Utc::now(),
        });
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn order_number_exists(&self, order_number: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(lock(&self.state)
            .orders
            .iter()
            .any(|o| o.order_number == order_number))
    }

    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        source: &str,
    ) -> Result<OrderDetails, StoreError> {
        self.check_available()?;
        let (failing_item, hidden) = {
            let faults = lock(&self.faults);
            (
                faults.failing_item.clone(),
                faults.hidden_numbers.contains(&order.order_number),
            )
        };

        let mut state = lock(&self.state);
        if hidden
            || state
                .orders
                .iter()
                .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber(order.order_number));
        }

        // Stage everything first; nothing is visible unless all rows succeed.
        let stored = Order {
            id: state.orders.len() as i32 + 1,
            order_number: order.order_number,
            email: order.email,
            phone: order.phone,
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
        };
        let mut staged = Vec::with_capacity(items.len());
        for (offset, item) in items.into_iter().enumerate() {
            if failing_item.as_deref() == Some(item.item_name.as_str()) {
                return Err(StoreError::ItemInsert {
                    item_name: item.item_name,
                    reason: "injected failure".to_string(),
                });
            }
            staged.push(OrderItem {
                id: (state.items.len() + offset) as i32 + 1,
                order_id: stored.id,
                item_name: item.item_name,
                quantity: item.quantity,
                price: item.price,
                extras: item.extras,
                size: item.size,
                piece_option: item.piece_option,
            });
        }

        state.record_change(stored.id, None, stored.status, source);
        state.orders.push(stored.clone());
        state.items.extend(staged.iter().cloned());
        Ok(OrderDetails {
            order: stored,
            items: staged,
        })
    }

    async fn find_order(&self, order_number: &str) -> Result<Option<OrderDetails>, StoreError> {
        self.check_available()?;
        let state = lock(&self.state);
        Ok(state
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .map(|order| state.details(order)))
    }

    async fn apply_payment(
        &self,
        order_number: &str,
        amount: &BigDecimal,
        source: &str,
    ) -> Result<Option<PaymentApplied>, StoreError> {
        self.check_available()?;
        let mut state = lock(&self.state);
        let Some(index) = state
            .orders
            .iter()
            .position(|o| o.order_number == order_number)
        else {
            return Ok(None);
        };

        let previous_status = state.orders[index].status;
        state.orders[index].status = OrderStatus::Paid;
        state.orders[index].total_amount = amount.clone();
        let order = state.orders[index].clone();
        if previous_status != OrderStatus::Paid {
            state.record_change(order.id, Some(previous_status), OrderStatus::Paid, source);
        }
        Ok(Some(PaymentApplied {
            order,
            previous_status,
        }))
    }

    async fn set_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        source: &str,
    ) -> Result<Option<Order>, StoreError> {
        self.check_available()?;
        let mut state = lock(&self.state);
        let Some(index) = state
            .orders
            .iter()
            .position(|o| o.order_number == order_number)
        else {
            return Ok(None);
        };

        let previous = state.orders[index].status;
        if previous != status {
            state.orders[index].status = status;
            let order_id = state.orders[index].id;
            state.record_change(order_id, Some(previous), status, source);
        }
        Ok(Some(state.orders[index].clone()))
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetails>, StoreError> {
        self.check_available()?;
        let state = lock(&self.state);
        let mut orders: Vec<_> = state.orders.iter().map(|o| state.details(o)).collect();
        orders.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.id.cmp(&a.order.id))
        });
        Ok(orders)
    }

    async fn list_orders_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderDetails>, StoreError> {
        self.check_available()?;
        let state = lock(&self.state);
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .filter(|o| o.created_at >= since)
            .map(|o| state.details(o))
            .collect();
        orders.sort_by_key(|d| d.order.created_at);
        Ok(orders)
    }

    async fn status_history(
        &self,
        order_number: &str,
    ) -> Result<Vec<OrderStatusChange>, StoreError> {
        self.check_available()?;
        let state = lock(&self.state);
        let Some(order) = state.orders.iter().find(|o| o.order_number == order_number) else {
            return Ok(Vec::new());
        };
        Ok(state
            .changes
            .iter()
            .filter(|c| c.order_id == order.id)
            .cloned()
            .collect())
    }
}
