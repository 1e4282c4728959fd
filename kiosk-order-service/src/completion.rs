use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::OrderError;
use crate::models::{NewOrder, NewOrderItem, OrderDetails, OrderStatus};
use crate::money::{deserialize_optional_amount, has_currency_precision, parse_amount};
use crate::notify::{MessageTemplates, NotificationDispatcher};
use crate::order_number::{OrderNumberGenerator, MAX_GENERATION_ATTEMPTS};
use crate::snapshot;
use crate::store::{OrderStore, StoreError};

pub const CHECKOUT_SOURCE: &str = "checkout";
pub const PAYFAST_SOURCE: &str = "payfast";

/// A checkout as posted by the storefront.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    #[serde(default)]
    pub items: Option<Vec<OrderItemSubmission>>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One cart line. Fields stay loosely typed so a bad line is reported
/// against its item name instead of rejecting the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemSubmission {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub selected_extras: Option<Value>,
    #[serde(default)]
    pub selected_size: Option<Value>,
    #[serde(default)]
    pub selected_option: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedOrder {
    pub order_number: String,
    pub notification_errors: Vec<String>,
}

fn parse_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn item_failure(name: Option<&str>, reason: &str) -> OrderError {
    OrderError::ItemPersistFailed {
        item_name: name.unwrap_or("unknown").to_string(),
        reason: reason.to_string(),
    }
}

impl OrderItemSubmission {
    fn to_new_item(&self) -> Result<NewOrderItem, OrderError> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let Some(item_name) = name else {
            return Err(item_failure(None, "item name is missing"));
        };
        let quantity = self
            .quantity
            .as_ref()
            .and_then(parse_quantity)
            .ok_or_else(|| item_failure(name, "quantity is missing or not a whole number"))?;
        if quantity <= 0 {
            return Err(item_failure(name, "quantity must be positive"));
        }
        let quantity = i32::try_from(quantity)
            .map_err(|_| item_failure(name, "quantity is too large"))?;
        let price = self
            .price
            .as_ref()
            .and_then(parse_amount)
            .ok_or_else(|| item_failure(name, "price is missing or not a number"))?;
        if price < BigDecimal::zero() {
            return Err(item_failure(name, "price must not be negative"));
        }
        if !has_currency_precision(&price) {
            return Err(OrderError::invalid(format!(
                "Price of {item_name} must have at most two decimal places"
            )));
        }

        Ok(NewOrderItem {
            item_name: item_name.to_string(),
            quantity,
            price,
            extras: snapshot::encode(self.selected_extras.as_ref()),
            size: snapshot::encode(self.selected_size.as_ref()),
            piece_option: snapshot::encode(self.selected_option.as_ref()),
        })
    }
}

fn contact(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turns a paid checkout into a durable order and tells the customer about
/// it.
pub struct OrderCompletionService {
    store: Arc<dyn OrderStore>,
    numbers: Arc<dyn OrderNumberGenerator>,
    notifier: Arc<NotificationDispatcher>,
    templates: MessageTemplates,
}

impl OrderCompletionService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        numbers: Arc<dyn OrderNumberGenerator>,
        notifier: Arc<NotificationDispatcher>,
        templates: MessageTemplates,
    ) -> Self {
        Self {
            store,
            numbers,
            notifier,
            templates,
        }
    }

    pub async fn complete_order(
        &self,
        submission: Option<OrderSubmission>,
    ) -> Result<CompletedOrder, OrderError> {
        let submission = submission.ok_or_else(|| OrderError::invalid("No data provided"))?;
        let items = match submission.items {
            Some(items) if !items.is_empty() => items,
            _ => return Err(OrderError::invalid("No items in order")),
        };
        let amount = submission
            .amount
            .ok_or_else(|| OrderError::invalid("Total amount not provided"))?;
        if amount <= BigDecimal::zero() {
            return Err(OrderError::invalid("Total amount must be greater than zero"));
        }
        if !has_currency_precision(&amount) {
            return Err(OrderError::invalid(
                "Total amount must have at most two decimal places",
            ));
        }
        let authorized = submission
            .payment_intent
            .as_deref()
            .is_some_and(|reference| !reference.trim().is_empty());
        if !authorized {
            return Err(OrderError::PaymentNotAuthorized(
                "Payment intent not provided".to_string(),
            ));
        }

        let new_items = build_items(&items)?;
        let details = self
            .persist(
                amount,
                contact(submission.email),
                contact(submission.phone),
                OrderStatus::Completed,
                new_items,
                CHECKOUT_SOURCE,
            )
            .await?;
        info!(
            order_number = %details.order.order_number,
            items = details.items.len(),
            "order completed"
        );

        let notification_errors = self.send_order_confirmation(&details).await;
        Ok(CompletedOrder {
            order_number: details.order.order_number,
            notification_errors,
        })
    }

    /// Mints the order number for a redirect payment. With items, the order
    /// is stored as pending so the settlement callback can find it.
    pub async fn reserve_order(
        &self,
        amount: &BigDecimal,
        items: Vec<OrderItemSubmission>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<String, OrderError> {
        if *amount <= BigDecimal::zero() {
            return Err(OrderError::invalid("Amount must be greater than zero"));
        }
        if !has_currency_precision(amount) {
            return Err(OrderError::invalid(
                "Amount must have at most two decimal places",
            ));
        }
        if items.is_empty() {
            let order_number = self.mint_order_number().await?;
            warn!(
                %order_number,
                %amount,
                "redirect payment without items, no order is stored for this number"
            );
            return Ok(order_number);
        }

        let new_items = build_items(&items)?;
        let details = self
            .persist(
                amount.clone(),
                contact(email),
                contact(phone),
                OrderStatus::Pending,
                new_items,
                PAYFAST_SOURCE,
            )
            .await?;
        info!(order_number = %details.order.order_number, "pending order reserved");
        Ok(details.order.order_number)
    }

    async fn mint_order_number(&self) -> Result<String, OrderError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = self.numbers.generate();
            if !self.store.order_number_exists(&candidate).await.map_err(log_store_error)? {
                return Ok(candidate);
            }
            warn!(order_number = %candidate, "order number collision");
        }
        Err(exhausted())
    }

    async fn persist(
        &self,
        total_amount: BigDecimal,
        email: Option<String>,
        phone: Option<String>,
        status: OrderStatus,
        items: Vec<NewOrderItem>,
        source: &str,
    ) -> Result<OrderDetails, OrderError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = self.numbers.generate();
            if self
                .store
                .order_number_exists(&candidate)
                .await
                .map_err(log_store_error)?
            {
                warn!(order_number = %candidate, "order number collision");
                continue;
            }

            let order = NewOrder {
                order_number: candidate,
                email: email.clone(),
                phone: phone.clone(),
                total_amount: total_amount.clone(),
                status,
                created_at: Utc::now(),
            };
            match self.store.create_order(order, items.clone(), source).await {
                Ok(details) => return Ok(details),
                Err(StoreError::DuplicateOrderNumber(number)) => {
                    warn!(order_number = %number, "order number taken concurrently");
                }
                Err(err) => return Err(log_store_error(err)),
            }
        }
        Err(exhausted())
    }

    async fn send_order_confirmation(&self, details: &OrderDetails) -> Vec<String> {
        let order = &details.order;
        let sms = async {
            match &order.phone {
                Some(phone) => {
                    let text = self.templates.order_confirmation_sms(&order.order_number);
                    Some(self.notifier.send_sms(phone, &text).await)
                }
                None => None,
            }
        };
        let email = async {
            match &order.email {
                Some(address) => {
                    let message = self.templates.order_confirmation_email(
                        &order.order_number,
                        &details.items,
                        &order.total_amount,
                    );
                    Some(
                        self.notifier
                            .send_email(address, &message.subject, &message.html)
                            .await,
                    )
                }
                None => None,
            }
        };
        let (sms_sent, email_sent) = tokio::join!(sms, email);

        let mut errors = Vec::new();
        if sms_sent == Some(false) {
            errors.push("SMS error: order confirmation could not be delivered".to_string());
        }
        if email_sent == Some(false) {
            errors.push("Email error: order confirmation could not be delivered".to_string());
        }
        errors
    }
}

fn build_items(items: &[OrderItemSubmission]) -> Result<Vec<NewOrderItem>, OrderError> {
    items
        .iter()
        .map(|item| {
            item.to_new_item().inspect_err(|err| {
                error!(error = %err, "rejected order item");
            })
        })
        .collect()
}

fn log_store_error(err: StoreError) -> OrderError {
    error!(error = ?err, "order store failure");
    err.into()
}

fn exhausted() -> OrderError {
    error!(attempts = MAX_GENERATION_ATTEMPTS, "order number space exhausted");
    OrderError::GenerationExhausted {
        attempts: MAX_GENERATION_ATTEMPTS,
    }
}
