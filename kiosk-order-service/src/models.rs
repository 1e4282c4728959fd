use std::fmt;
use std::io::Write;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};

use crate::schema::{order_items, order_status_changes, orders};

#[derive(FromSqlRow, AsExpression, Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::OrderStatus)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Orders that count as revenue in sales reports.
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Paid)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownOrderStatus(s.to_string()))
    }
}

impl ToSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(OrderStatus::Pending),
            b"preparing" => Ok(OrderStatus::Preparing),
            b"ready" => Ok(OrderStatus::Ready),
            b"completed" => Ok(OrderStatus::Completed),
            b"paid" => Ok(OrderStatus::Paid),
            b"cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub order_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub item_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub extras: Option<String>,
    pub size: Option<String>,
    pub piece_option: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

/// An order item before it is attached to a stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub item_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub extras: Option<String>,
    pub size: Option<String>,
    pub piece_option: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = order_items)]
pub(crate) struct OrderItemRow<'a> {
    pub order_id: i32,
    pub item_name: &'a str,
    pub quantity: i32,
    pub price: &'a BigDecimal,
    pub extras: Option<&'a str>,
    pub size: Option<&'a str>,
    pub piece_option: Option<&'a str>,
}

impl<'a> OrderItemRow<'a> {
    pub fn new(order_id: i32, item: &'a NewOrderItem) -> Self {
        Self {
            order_id,
            item_name: &item.item_name,
            quantity: item.quantity,
            price: &item.price,
            extras: item.extras.as_deref(),
            size: item.size.as_deref(),
            piece_option: item.piece_option.as_deref(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_status_changes)]
pub struct OrderStatusChange {
    pub id: i32,
    pub order_id: i32,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub source: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = order_status_changes)]
pub(crate) struct NewOrderStatusChange<'a> {
    pub order_id: i32,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub source: &'a str,
    pub changed_at: DateTime<Utc>,
}

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of applying a settled payment to an order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentApplied {
    pub order: Order,
    pub previous_status: OrderStatus,
}
