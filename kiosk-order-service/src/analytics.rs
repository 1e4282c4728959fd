//! Sales figures for the admin dashboard.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::models::OrderDetails;
use crate::store::{OrderStore, StoreError};

pub const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Error)]
#[error("Timeframe must be one of: daily, weekly, monthly")]
pub struct UnknownTimeframe;

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            _ => Err(UnknownTimeframe),
        }
    }
}

impl Timeframe {
    pub fn window(&self) -> TimeDelta {
        match self {
            Timeframe::Daily => TimeDelta::days(7),
            Timeframe::Weekly => TimeDelta::weeks(4),
            Timeframe::Monthly => TimeDelta::days(365),
        }
    }

    fn bucket_format(&self) -> &'static str {
        match self {
            Timeframe::Daily => "%Y-%m-%d",
            Timeframe::Weekly => "%Y-%W",
            Timeframe::Monthly => "%Y-%m",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenuePoint {
    pub date: String,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryShare {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesReport {
    pub total_revenue: BigDecimal,
    pub total_orders: usize,
    pub average_order_value: BigDecimal,
    pub daily: Vec<RevenuePoint>,
    pub category_wise: Vec<CategoryShare>,
    pub top_products: Vec<ProductSales>,
}

/// Maps an item name to a dashboard category by keyword.
pub fn categorize(item_name: &str) -> &'static str {
    let name = item_name.to_lowercase();
    if name.contains("burger") {
        "Burgers"
    } else if name.contains("pizza") {
        "Pizza"
    } else if name.contains("drink") || name.contains("soda") {
        "Drinks"
    } else if name.contains("side") {
        "Sides"
    } else if name.contains("breakfast") {
        "Breakfast"
    } else {
        "Uncategorized"
    }
}

/// Builds the report from already-windowed orders. Only settled orders
/// count.
pub fn sales_report(orders: &[OrderDetails], timeframe: Timeframe) -> SalesReport {
    let settled: Vec<&OrderDetails> = orders
        .iter()
        .filter(|details| details.order.status.is_settled())
        .collect();

    let mut total_revenue = BigDecimal::zero();
    let mut buckets: BTreeMap<String, BigDecimal> = BTreeMap::new();
    let mut categories: BTreeMap<&'static str, i64> = BTreeMap::new();
    let mut products: HashMap<&str, i64> = HashMap::new();

    for details in &settled {
        let order = &details.order;
        total_revenue += &order.total_amount;
        let bucket = order
            .created_at
            .format(timeframe.bucket_format())
            .to_string();
        *buckets.entry(bucket).or_insert_with(BigDecimal::zero) += &order.total_amount;

        for item in &details.items {
            let quantity = i64::from(item.quantity);
            *categories.entry(categorize(&item.item_name)).or_default() += quantity;
            *products.entry(item.item_name.as_str()).or_default() += quantity;
        }
    }

    let total_orders = settled.len();
    let average_order_value = if total_orders == 0 {
        BigDecimal::zero()
    } else {
        (&total_revenue / BigDecimal::from(total_orders as u64))
            .with_scale_round(2, RoundingMode::HalfUp)
    };

    let mut top_products: Vec<ProductSales> = products
        .into_iter()
        .map(|(name, quantity)| ProductSales {
            name: name.to_string(),
            quantity,
        })
        .collect();
    top_products.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    top_products.truncate(TOP_PRODUCTS);

    SalesReport {
        total_revenue,
        total_orders,
        average_order_value,
        daily: buckets
            .into_iter()
            .map(|(date, revenue)| RevenuePoint { date, revenue })
            .collect(),
        category_wise: categories
            .into_iter()
            .map(|(name, value)| CategoryShare {
                name: name.to_string(),
                value,
            })
            .collect(),
        top_products,
    }
}

pub async fn build_report(
    store: &dyn OrderStore,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Result<SalesReport, StoreError> {
    let orders = store.list_orders_since(now - timeframe.window()).await?;
    Ok(sales_report(&orders, timeframe))
}
