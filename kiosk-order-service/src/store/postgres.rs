use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use super::{OrderStore, StoreError};
use crate::models::{
    NewOrder, NewOrderItem, NewOrderStatusChange, Order, OrderDetails, OrderItem, OrderItemRow,
    OrderStatus, OrderStatusChange, PaymentApplied,
};
use crate::schema::{order_items, order_status_changes, orders};
use crate::DbPool;

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

#[derive(Clone)]
pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<Object<AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

fn classify_order_insert(err: DieselError, order_number: &str) -> StoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(ORDER_NUMBER_CONSTRAINT) =>
        {
            StoreError::DuplicateOrderNumber(order_number.to_string())
        }
        _ => StoreError::Query(err),
    }
}

async fn record_change(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    from_status: Option<OrderStatus>,
    to_status: OrderStatus,
    source: &str,
) -> Result<(), StoreError> {
    diesel::insert_into(order_status_changes::table)
        .values(NewOrderStatusChange {
            order_id,
            from_status,
            to_status,
            source,
            changed_at: Utc::now(),
        })
        .execute(conn)
        .await?;
    Ok(())
}

async fn attach_items(
    conn: &mut AsyncPgConnection,
    orders: Vec<Order>,
) -> Result<Vec<OrderDetails>, StoreError> {
    let items = OrderItem::belonging_to(&orders)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load(conn)
        .await?;
    Ok(items
        .grouped_by(&orders)
        .into_iter()
        .zip(orders)
        .map(|(items, order)| OrderDetails { order, items })
        .collect())
}

async fn lock_order(
    conn: &mut AsyncPgConnection,
    order_number: &str,
) -> Result<Option<Order>, StoreError> {
    let order = orders::table
        .filter(orders::order_number.eq(order_number))
        .select(Order::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;
    Ok(order)
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn order_number_exists(&self, order_number: &str) -> Result<bool, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let exists = diesel::select(diesel::dsl::exists(
            orders::table.filter(orders::order_number.eq(order_number)),
        ))
        .get_result(conn)
        .await?;
        Ok(exists)
    }

    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        source: &str,
    ) -> Result<OrderDetails, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let stored: Order = diesel::insert_into(orders::table)
                    .values(&order)
                    .returning(Order::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|e| classify_order_insert(e, &order.order_number))?;

                // One row at a time so a failure names the offending item.
                let mut stored_items = Vec::with_capacity(items.len());
                for item in &items {
                    let row = diesel::insert_into(order_items::table)
                        .values(OrderItemRow::new(stored.id, item))
                        .returning(OrderItem::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(|e| StoreError::ItemInsert {
                            item_name: item.item_name.clone(),
                            reason: e.to_string(),
                        })?;
                    stored_items.push(row);
                }

                record_change(conn, stored.id, None, stored.status, source).await?;

                Ok(OrderDetails {
                    order: stored,
                    items: stored_items,
                })
            }
            .scope_boxed()
        })
        .await
    }

    async fn find_order(&self, order_number: &str) -> Result<Option<OrderDetails>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let order = orders::table
            .filter(orders::order_number.eq(order_number))
            .select(Order::as_select())
            .first(conn)
            .await
            .optional()?;
        match order {
            Some(order) => Ok(attach_items(conn, vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn apply_payment(
        &self,
        order_number: &str,
        amount: &BigDecimal,
        source: &str,
    ) -> Result<Option<PaymentApplied>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let Some(current) = lock_order(conn, order_number).await? else {
                    return Ok(None);
                };

                let updated = diesel::update(orders::table.find(current.id))
                    .set((
                        orders::status.eq(OrderStatus::Paid),
                        orders::total_amount.eq(amount),
                    ))
                    .returning(Order::as_returning())
                    .get_result(conn)
                    .await?;

                if current.status != OrderStatus::Paid {
                    record_change(conn, current.id, Some(current.status), OrderStatus::Paid, source)
                        .await?;
                }

                Ok(Some(PaymentApplied {
                    order: updated,
                    previous_status: current.status,
                }))
            }
            .scope_boxed()
        })
        .await
    }

    async fn set_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        source: &str,
    ) -> Result<Option<Order>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let Some(current) = lock_order(conn, order_number).await? else {
                    return Ok(None);
                };
                if current.status == status {
                    return Ok(Some(current));
                }

                let updated = diesel::update(orders::table.find(current.id))
                    .set(orders::status.eq(status))
                    .returning(Order::as_returning())
                    .get_result(conn)
                    .await?;
                record_change(conn, current.id, Some(current.status), status, source).await?;
                Ok(Some(updated))
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_orders(&self) -> Result<Vec<OrderDetails>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let orders = orders::table
            .select(Order::as_select())
            .order((orders::created_at.desc(), orders::id.desc()))
            .load(conn)
            .await?;
        attach_items(conn, orders).await
    }

    async fn list_orders_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderDetails>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let orders = orders::table
            .filter(orders::created_at.ge(since))
            .select(Order::as_select())
            .order(orders::created_at.asc())
            .load(conn)
            .await?;
        attach_items(conn, orders).await
    }

    async fn status_history(
        &self,
        order_number: &str,
    ) -> Result<Vec<OrderStatusChange>, StoreError> {
        let mut obj = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut obj;
        let changes = order_status_changes::table
            .inner_join(orders::table)
            .filter(orders::order_number.eq(order_number))
            .select(OrderStatusChange::as_select())
            .order(order_status_changes::id.asc())
            .load(conn)
            .await?;
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::establish_pool;

    // Requires DATABASE_URL pointing at a migrated, disposable database.
    fn store() -> PgOrderStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        PgOrderStore::new(establish_pool(&url, 2).unwrap())
    }

    fn new_order(number: &str) -> NewOrder {
        NewOrder {
            order_number: number.to_string(),
            email: None,
            phone: None,
            total_amount: BigDecimal::from(100),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn item(name: &str, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            item_name: name.to_string(),
            quantity,
            price: BigDecimal::from_str("50.00").unwrap(),
            extras: None,
            size: None,
            piece_option: None,
        }
    }

    fn unique_number() -> String {
        use crate::order_number::{OrderNumberGenerator, RandomOrderNumbers};
        RandomOrderNumbers.generate()
    }

    #[tokio::test]
    #[ignore]
    async fn create_and_pay_order() {
        let store = store();
        let number = unique_number();
        let created = store
            .create_order(new_order(&number), vec![item("Burger", 2)], "test")
            .await
            .unwrap();
        assert_eq!(created.items.len(), 1);
        assert!(store.order_number_exists(&number).await.unwrap());

        let applied = store
            .apply_payment(&number, &BigDecimal::from(120), "test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.previous_status, OrderStatus::Pending);
        assert_eq!(applied.order.status, OrderStatus::Paid);
        assert_eq!(applied.order.total_amount, BigDecimal::from(120));

        let history = store.status_history(&number).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    #[ignore]
    async fn failing_item_rolls_back_whole_order() {
        let store = store();
        let number = unique_number();
        let err = store
            .create_order(
                new_order(&number),
                vec![item("Burger", 1), item("Broken", 0)],
                "test",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ItemInsert { ref item_name, .. } if item_name == "Broken"));
        assert!(!store.order_number_exists(&number).await.unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn duplicate_number_is_reported() {
        let store = store();
        let number = unique_number();
        store
            .create_order(new_order(&number), vec![item("Burger", 1)], "test")
            .await
            .unwrap();
        let err = store
            .create_order(new_order(&number), vec![item("Burger", 1)], "test")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNumber(n) if n == number));
    }
}
