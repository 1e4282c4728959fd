use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::TimeDelta;
use http_body_util::BodyExt;
use kiosk_api_gateway::state::{AppState, Services};
use kiosk_auth_service::store::InMemoryAdminStore;
use kiosk_auth_service::{NewAdmin, TokenService};
use kiosk_menu_service::PgMenuStore;
use kiosk_order_service::notify::{
    MessageTemplates, NotificationDispatcher, RecordingTransport, SentMessage,
};
use kiosk_order_service::order_number::ScriptedOrderNumbers;
use kiosk_order_service::payfast::{self, PayfastConfig, SignaturePolicy};
use kiosk_order_service::payments::FixedIntentIssuer;
use kiosk_order_service::store::InMemoryOrderStore;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSPHRASE: &str = "jt7NOE43FZPn";

struct TestApp {
    app: Router,
    state: AppState,
    orders: Arc<InMemoryOrderStore>,
    intents: Arc<FixedIntentIssuer>,
    sms: Arc<RecordingTransport>,
}

fn test_app(order_numbers: &[&str]) -> TestApp {
    test_app_with(order_numbers, FixedIntentIssuer::new())
}

fn test_app_with(order_numbers: &[&str], intents: FixedIntentIssuer) -> TestApp {
    let orders = Arc::new(InMemoryOrderStore::new());
    let intents = Arc::new(intents);
    let sms = Arc::new(RecordingTransport::new());
    let email = Arc::new(RecordingTransport::new());
    // Never connected to: menu writes are validated before a connection is
    // checked out.
    let pool = kiosk_order_service::establish_pool("postgres://kiosk@127.0.0.1:1/kiosk", 1)
        .unwrap();

    let services = Services {
        orders: orders.clone(),
        admins: Arc::new(InMemoryAdminStore::new()),
        menu: PgMenuStore::new(pool),
        intents: intents.clone(),
        notifier: Arc::new(NotificationDispatcher::new(
            sms.clone(),
            email,
            Duration::from_secs(1),
        )),
        numbers: Arc::new(ScriptedOrderNumbers::new(order_numbers.iter().copied())),
    };
    let state = AppState::new(
        services,
        PayfastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: "46f0cd694581a".to_string(),
            passphrase: PASSPHRASE.to_string(),
            signature_policy: SignaturePolicy::Enforce,
        },
        MessageTemplates::default(),
        TokenService::new("test-secret", TimeDelta::hours(1)),
    );

    TestApp {
        app: kiosk_api_gateway::app(state.clone(), &[]),
        state,
        orders,
        intents,
        sms,
    }
}

fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

async fn admin_token(app: &TestApp) -> String {
    app.state
        .auth
        .create_admin(NewAdmin {
            username: "alice".to_string(),
            email: "alice@kiosk.test".to_string(),
            password: "s3cret".to_string(),
        })
        .await
        .unwrap();

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/login",
            json!({"username": "alice", "password": "s3cret"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn completed_checkout_is_stored_and_confirmed() {
    let app = test_app(&["AB12CD34"]);

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/complete-order",
            json!({
                "items": [
                    {"name": "Burger", "quantity": 2, "price": 50.0, "selectedSize": {"name": "Large"}}
                ],
                "amount": 100.0,
                "paymentIntent": "pi_123",
                "phone": "+27820000000"
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order_number"], "AB12CD34");
    assert!(body.get("notification_errors").is_none());

    assert_eq!(
        app.sms.sent(),
        vec![SentMessage::Sms {
            to: "+27820000000".to_string(),
            body: "Your KIOSK order number is: AB12CD34. Thank you for your order!".to_string(),
        }]
    );

    let (status, body) = send(&app.app, get("/api/order-status/AB12CD34", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn checkout_without_items_is_rejected() {
    let app = test_app(&[]);

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/complete-order",
            json!({"items": [], "amount": 10, "paymentIntent": "pi_123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(body["error"], "No items in order");
    assert_eq!(app.orders.order_count(), 0);
}

#[tokio::test]
async fn checkout_without_payment_intent_is_not_authorized() {
    let app = test_app(&[]);

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/complete-order",
            json!({"items": [{"name": "Soda", "quantity": 1, "price": 15}], "amount": 15}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_NOT_AUTHORIZED");
    assert_eq!(app.orders.order_count(), 0);
}

#[tokio::test]
async fn unknown_order_status_is_not_found() {
    let app = test_app(&[]);

    let (status, body) = send(&app.app, get("/api/order-status/ZZZZZZZZ", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order not found");
}

#[tokio::test]
async fn payment_intent_requires_positive_amount() {
    let app = test_app(&[]);

    let (status, body) = send(
        &app.app,
        json_request(Method::POST, "/api/create-payment-intent", json!({"amount": 0}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Amount must be greater than zero");
    assert!(app.intents.requested().is_empty());

    let (status, body) = send(
        &app.app,
        json_request(Method::POST, "/api/create-payment-intent", json!({"amount": 25.5}), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "pi_test_1_secret");
    assert_eq!(app.intents.requested().len(), 1);
}

#[tokio::test]
async fn payment_provider_failure_is_bad_gateway() {
    let app = test_app_with(&[], FixedIntentIssuer::failing("card_declined"));

    let (status, body) = send(
        &app.app,
        json_request(Method::POST, "/api/create-payment-intent", json!({"amount": 40}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYMENT_PROVIDER_FAILED");
    assert!(!body.to_string().contains("card_declined"));
    assert_eq!(app.intents.requested().len(), 1);
}

#[tokio::test]
async fn sub_cent_amounts_are_rejected() {
    let app = test_app(&["AB12CD34"]);

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/complete-order",
            json!({
                "items": [{"name": "Burger", "quantity": 1, "price": 0.001}],
                "amount": 0.001,
                "paymentIntent": "pi_123"
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(body["error"], "Total amount must have at most two decimal places");
    assert_eq!(app.orders.order_count(), 0);

    let (status, _) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/create-payment-intent",
            json!({"amount": "12.345"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.intents.requested().is_empty());
}

fn signed_callback(pairs: &[(&str, &str)]) -> String {
    let mut fields: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let signature = payfast::signature(&fields, PASSPHRASE);
    fields.insert("signature".to_string(), signature);
    form_body(&fields)
}

fn form_body(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_request(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/payment/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn redirect_payment_is_settled_by_signed_callback() {
    let app = test_app(&["PF000001"]);

    let (status, fields) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/payfast-payment",
            json!({
                "amount": 99.5,
                "base_url": "https://kiosk.test",
                "items": [{"name": "Pizza", "quantity": 1, "price": 99.5}]
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fields["m_payment_id"], "PF000001");
    assert_eq!(fields["amount"], "99.50");
    assert_eq!(fields["notify_url"], "https://kiosk.test/api/payment/notify");

    let (status, body) = send(&app.app, get("/api/order-status/PF000001", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let callback = signed_callback(&[
        ("m_payment_id", "PF000001"),
        ("payment_status", "COMPLETE"),
        ("amount_gross", "99.50"),
    ]);
    let (status, body) = send(&app.app, form_request(callback)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));

    let (_, body) = send(&app.app, get("/api/order-status/PF000001", None)).await;
    assert_eq!(body["status"], "paid");
}

#[tokio::test]
async fn callback_with_blank_fields_settles_the_order() {
    let app = test_app(&["PF000003"]);
    send(
        &app.app,
        json_request(
            Method::POST,
            "/api/payfast-payment",
            json!({
                "amount": 35,
                "base_url": "https://kiosk.test",
                "items": [{"name": "Wrap", "quantity": 1, "price": 35}]
            }),
            None,
        ),
    )
    .await;

    let callback = signed_callback(&[
        ("m_payment_id", "PF000003"),
        ("payment_status", "COMPLETE"),
        ("amount_gross", "35.00"),
        ("name_first", ""),
        ("custom_str1", ""),
    ]);
    assert!(callback.contains("name_first=&"));
    let (status, _) = send(&app.app, form_request(callback)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app.app, get("/api/order-status/PF000003", None)).await;
    assert_eq!(body["status"], "paid");
}

#[tokio::test]
async fn forged_callback_is_rejected() {
    let app = test_app(&["PF000002"]);
    send(
        &app.app,
        json_request(
            Method::POST,
            "/api/payfast-payment",
            json!({
                "amount": 20,
                "base_url": "https://kiosk.test",
                "items": [{"name": "Fries", "quantity": 1, "price": 20}]
            }),
            None,
        ),
    )
    .await;

    let fields = BTreeMap::from([
        ("m_payment_id".to_string(), "PF000002".to_string()),
        ("payment_status".to_string(), "COMPLETE".to_string()),
        ("amount_gross".to_string(), "20.00".to_string()),
        ("signature".to_string(), "0123456789abcdef0123456789abcdef".to_string()),
    ]);
    let (status, body) = send(&app.app, form_request(form_body(&fields))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SIGNATURE_INVALID");

    let (_, body) = send(&app.app, get("/api/order-status/PF000002", None)).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn admin_routes_require_a_bearer_token() {
    let app = test_app(&[]);

    let (status, body) = send(&app.app, get("/api/admin/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No authorization header");

    let (status, body) = send(&app.app, get("/api/admin/orders", Some("not-a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = test_app(&[]);
    admin_token(&app).await;

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/login",
            json!({"username": "alice", "password": "wrong"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn admin_status_change_is_audited() {
    let app = test_app(&["AB12CD34"]);
    let token = admin_token(&app).await;

    send(
        &app.app,
        json_request(
            Method::POST,
            "/api/complete-order",
            json!({
                "items": [{"name": "Burger", "quantity": 1, "price": 50}],
                "amount": 50,
                "paymentIntent": "pi_123"
            }),
            None,
        ),
    )
    .await;

    let (status, body) = send(
        &app.app,
        json_request(
            Method::PUT,
            "/api/admin/orders/AB12CD34/status",
            json!({"status": "bogus"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = send(
        &app.app,
        json_request(
            Method::PUT,
            "/api/admin/orders/AB12CD34/status",
            json!({"status": "preparing"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "preparing");

    let (status, body) = send(
        &app.app,
        get("/api/admin/orders/AB12CD34/history", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let changes = body.as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["source"], "checkout");
    assert_eq!(changes[0]["to_status"], "completed");
    assert_eq!(changes[1]["from_status"], "completed");
    assert_eq!(changes[1]["to_status"], "preparing");
    assert_eq!(changes[1]["source"], "admin:alice");

    let (status, body) = send(&app.app, get("/api/admin/orders", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["order_number"], "AB12CD34");
    assert_eq!(body[0]["items"][0]["item_name"], "Burger");

    let (status, _) = send(
        &app.app,
        json_request(
            Method::PUT,
            "/api/admin/orders/ZZZZZZZZ/status",
            json!({"status": "ready"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_rejects_unknown_timeframe() {
    let app = test_app(&[]);
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.app,
        get("/api/admin/analytics?timeframe=hourly", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Timeframe must be one of: daily, weekly, monthly");

    let (status, body) = send(&app.app, get("/api/admin/analytics", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalOrders"], 0);
}

#[tokio::test]
async fn menu_item_without_name_is_rejected() {
    let app = test_app(&[]);
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/menu-items",
            json!({"description": "Beef patty", "price": 50, "category": "Burgers"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn admin_creation_needs_an_admin() {
    let app = test_app(&[]);

    let (status, _) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/create",
            json!({"username": "bob", "email": "bob@kiosk.test", "password": "pw"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&app).await;
    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/create",
            json!({"username": "bob", "email": "bob@kiosk.test", "password": "pw"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "bob");

    let (status, body) = send(
        &app.app,
        json_request(
            Method::POST,
            "/api/admin/create",
            json!({"username": "bob", "email": "other@kiosk.test", "password": "pw"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}
