pub mod admin_orders;
pub mod analytics;
pub mod auth;
pub mod category;
pub mod menu;
pub mod order;
pub mod payment;

use axum::{Router, extract::FromRequest};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::middleware::require_admin;
use crate::state::AppState;

/// `Json` whose rejections are reported in the API error format.
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Every endpoint under `/api`. Admin routes sit behind [`require_admin`].
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .merge(order::router())
        .merge(payment::router())
        .merge(auth::public_router())
        .merge(menu::public_router())
        .merge(category::public_router());

    let admin = Router::new()
        .merge(admin_orders::router())
        .merge(auth::admin_router())
        .merge(menu::admin_router())
        .merge(category::admin_router())
        .merge(analytics::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .nest("/api", public.merge(admin))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        order::complete_order,
        order::get_order_status,
        payment::create_payment_intent,
        payment::payfast_payment,
        payment::payment_notify,
        auth::login,
        auth::create_admin,
        admin_orders::list_orders,
        admin_orders::update_order_status,
        admin_orders::order_history,
        menu::list_menu_items,
        menu::list_all_menu_items,
        menu::create_menu_item,
        menu::update_menu_item,
        menu::delete_menu_item,
        category::list_categories,
        category::create_category,
        category::update_category,
        category::delete_category,
        analytics::get_analytics,
    ),
    components(
        schemas(
            crate::models::ApiErrorResponse,
            crate::models::MessageResponse,
            crate::models::CheckoutItem,
            crate::models::CompleteOrderRequest,
            crate::models::CompleteOrderResponse,
            crate::models::OrderStatusResponse,
            crate::models::PaymentIntentRequest,
            crate::models::PaymentIntentResponse,
            crate::models::PayfastPaymentRequest,
            crate::models::AdminOrderItem,
            crate::models::AdminOrder,
            crate::models::UpdateOrderStatusRequest,
            crate::models::UpdateOrderStatusResponse,
            crate::models::StatusChangeResponse,
            crate::models::LoginRequest,
            crate::models::LoginResponse,
            crate::models::CreateAdminRequest,
            crate::models::CreateAdminResponse,
            crate::models::PricedOptionRequest,
            crate::models::PieceOptionRequest,
            crate::models::CreateMenuItemRequest,
            crate::models::UpdateMenuItemRequest,
            crate::models::PricedOptionResponse,
            crate::models::PieceOptionResponse,
            crate::models::MenuItemResponse,
            crate::models::CreatedResponse,
            crate::models::CategoryRequest,
            crate::models::CategoryResponse,
            crate::models::RevenuePointResponse,
            crate::models::CategoryShareResponse,
            crate::models::ProductSalesResponse,
            crate::models::AnalyticsResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Checkout and order status"),
        (name = "payments", description = "Card payment intents and hosted payment redirects"),
        (name = "menu", description = "Menu items and categories"),
        (name = "admin", description = "Admin accounts, order management and analytics")
    ),
    info(
        title = "Kiosk API",
        description = "Ordering backend for self-service restaurant kiosks",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
