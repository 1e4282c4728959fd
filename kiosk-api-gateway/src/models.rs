use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use kiosk_menu_service::models::{Category, MenuItemDetails};
use kiosk_menu_service::{CategoryDraft, MenuItemDraft, MenuItemPatch, PieceOptionDraft, PricedOption};
use kiosk_order_service::analytics::SalesReport;
use kiosk_order_service::models::{Order, OrderDetails, OrderItem, OrderStatusChange};
use kiosk_order_service::money::deserialize_optional_amount;
use kiosk_order_service::{OrderItemSubmission, OrderSubmission, snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;

fn amount(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error code, e.g. `INVALID_REQUEST`
    pub code: String,
    /// Error message
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// Checkout

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<Value>,
    /// Unit price
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub selected_extras: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub selected_size: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub selected_option: Option<Value>,
}

impl From<CheckoutItem> for OrderItemSubmission {
    fn from(item: CheckoutItem) -> Self {
        OrderItemSubmission {
            name: item.name,
            quantity: item.quantity,
            price: item.price,
            selected_extras: item.selected_extras,
            selected_size: item.selected_size,
            selected_option: item.selected_option,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderRequest {
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    /// Order total
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<BigDecimal>,
    /// Reference of the authorized card payment
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<CompleteOrderRequest> for OrderSubmission {
    fn from(request: CompleteOrderRequest) -> Self {
        OrderSubmission {
            items: request
                .items
                .map(|items| items.into_iter().map(Into::into).collect()),
            amount: request.amount,
            payment_intent: request.payment_intent,
            email: request.email,
            phone: request.phone,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteOrderResponse {
    pub success: bool,
    pub order_number: String,
    /// Present only when a confirmation could not be delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    pub order_number: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderStatusResponse {
    fn from(order: Order) -> Self {
        Self {
            order_number: order.order_number,
            status: order.status.to_string(),
            created_at: order.created_at,
        }
    }
}

// Payments

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    /// Amount in major currency units
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<BigDecimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayfastPaymentRequest {
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<BigDecimal>,
    /// Storefront origin used for the return, cancel and notify URLs
    #[serde(default)]
    pub base_url: Option<String>,
    /// When present, a pending order is stored under the new order number
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// Admin orders

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderItem {
    pub item_name: String,
    pub quantity: i32,
    pub price: f64,
    #[schema(value_type = Object)]
    pub extras: Value,
    #[schema(value_type = Object)]
    pub size: Value,
    #[schema(value_type = Object)]
    pub piece_option: Value,
}

impl From<OrderItem> for AdminOrderItem {
    fn from(item: OrderItem) -> Self {
        Self {
            price: amount(&item.price),
            extras: snapshot::decode(item.extras.as_deref()),
            size: snapshot::decode(item.size.as_deref()),
            piece_option: snapshot::decode(item.piece_option.as_deref()),
            item_name: item.item_name,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrder {
    pub id: i32,
    pub order_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<AdminOrderItem>,
}

impl From<OrderDetails> for AdminOrder {
    fn from(details: OrderDetails) -> Self {
        let OrderDetails { order, items } = details;
        Self {
            id: order.id,
            total_amount: amount(&order.total_amount),
            status: order.status.to_string(),
            order_number: order.order_number,
            email: order.email,
            phone: order.phone,
            created_at: order.created_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of pending, preparing, ready, completed, paid, cancelled
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateOrderStatusResponse {
    pub order_number: String,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusChangeResponse {
    /// Absent for the row written when the order was created
    pub from_status: Option<String>,
    pub to_status: String,
    /// `checkout`, `payfast` or `admin:<username>`
    pub source: String,
    pub changed_at: DateTime<Utc>,
}

impl From<OrderStatusChange> for StatusChangeResponse {
    fn from(change: OrderStatusChange) -> Self {
        Self {
            from_status: change.from_status.map(|s| s.to_string()),
            to_status: change.to_status.to_string(),
            source: change.source,
            changed_at: change.changed_at,
        }
    }
}

// Admin accounts

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAdminResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub message: String,
}

// Menu

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MenuQuery {
    /// Only items in this category
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PricedOptionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PieceOptionRequest {
    pub quantity: i32,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub is_default: bool,
}

fn priced_options(
    options: Vec<PricedOptionRequest>,
    what: &str,
) -> Result<Vec<PricedOption>, ApiError> {
    options
        .into_iter()
        .map(|option| {
            let price = option
                .price
                .ok_or_else(|| ApiError::InvalidRequest(format!("{what} price is required")))?;
            Ok(PricedOption {
                name: option.name,
                price,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub extras: Vec<PricedOptionRequest>,
    #[serde(default)]
    pub sizes: Vec<PricedOptionRequest>,
    #[serde(default)]
    pub piece_options: Vec<PieceOptionRequest>,
}

impl TryFrom<CreateMenuItemRequest> for MenuItemDraft {
    type Error = ApiError;

    fn try_from(request: CreateMenuItemRequest) -> Result<Self, Self::Error> {
        let piece_options = request
            .piece_options
            .into_iter()
            .map(|option| {
                let price = option.price.ok_or_else(|| {
                    ApiError::InvalidRequest("piece option price is required".to_string())
                })?;
                Ok(PieceOptionDraft {
                    quantity: option.quantity,
                    price,
                    is_default: option.is_default,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(MenuItemDraft {
            name: request.name,
            description: request.description,
            price: request.price,
            category: request.category,
            image_url: request.image_url,
            is_available: request.is_available,
            extras: priced_options(request.extras, "extra")?,
            sizes: priced_options(request.sizes, "size")?,
            piece_options,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl From<UpdateMenuItemRequest> for MenuItemPatch {
    fn from(request: UpdateMenuItemRequest) -> Self {
        MenuItemPatch {
            name: request.name,
            description: request.description,
            price: request.price,
            category: request.category,
            image_url: request.image_url,
            is_available: request.is_available,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricedOptionResponse {
    pub id: i32,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PieceOptionResponse {
    pub id: i32,
    pub quantity: i32,
    pub price: f64,
    pub is_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub extras: Vec<PricedOptionResponse>,
    pub sizes: Vec<PricedOptionResponse>,
    pub piece_options: Vec<PieceOptionResponse>,
}

impl From<MenuItemDetails> for MenuItemResponse {
    fn from(details: MenuItemDetails) -> Self {
        let MenuItemDetails {
            item,
            extras,
            sizes,
            piece_options,
        } = details;
        Self {
            id: item.id,
            price: amount(&item.price),
            name: item.name,
            description: item.description,
            category: item.category,
            image_url: item.image_url,
            is_available: item.is_available,
            extras: extras
                .into_iter()
                .map(|e| PricedOptionResponse {
                    id: e.id,
                    price: amount(&e.price),
                    name: e.name,
                })
                .collect(),
            sizes: sizes
                .into_iter()
                .map(|s| PricedOptionResponse {
                    id: s.id,
                    price: amount(&s.price),
                    name: s.name,
                })
                .collect(),
            piece_options: piece_options
                .into_iter()
                .map(|p| PieceOptionResponse {
                    id: p.id,
                    quantity: p.quantity,
                    price: amount(&p.price),
                    is_default: p.is_default,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i32,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl From<CategoryRequest> for CategoryDraft {
    fn from(request: CategoryRequest) -> Self {
        CategoryDraft {
            name: request.name,
            description: request.description,
            image_url: request.image_url,
            icon: request.icon,
            is_default: request.is_default,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub icon: Option<String>,
    pub is_default: bool,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            image_url: category.image_url,
            icon: category.icon,
            is_default: category.is_default,
        }
    }
}

// Analytics

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// daily (default), weekly or monthly
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenuePointResponse {
    /// Bucket label, `%Y-%m-%d`, `%Y-%W` or `%Y-%m`
    pub date: String,
    pub revenue: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryShareResponse {
    pub name: String,
    /// Units sold
    pub value: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSalesResponse {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub average_order_value: f64,
    pub daily: Vec<RevenuePointResponse>,
    pub category_wise: Vec<CategoryShareResponse>,
    pub top_products: Vec<ProductSalesResponse>,
}

impl From<SalesReport> for AnalyticsResponse {
    fn from(report: SalesReport) -> Self {
        Self {
            total_revenue: amount(&report.total_revenue),
            total_orders: report.total_orders,
            average_order_value: amount(&report.average_order_value),
            daily: report
                .daily
                .into_iter()
                .map(|p| RevenuePointResponse {
                    revenue: amount(&p.revenue),
                    date: p.date,
                })
                .collect(),
            category_wise: report
                .category_wise
                .into_iter()
                .map(|c| CategoryShareResponse {
                    name: c.name,
                    value: c.value,
                })
                .collect(),
            top_products: report
                .top_products
                .into_iter()
                .map(|p| ProductSalesResponse {
                    name: p.name,
                    quantity: p.quantity,
                })
                .collect(),
        }
    }
}
