use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use tracing::{error, info, warn};

use crate::completion::PAYFAST_SOURCE;
use crate::error::OrderError;
use crate::models::{Order, OrderStatus};
use crate::notify::{MessageTemplates, NotificationDispatcher};
use crate::payfast::{PayfastGateway, SignaturePolicy};
use crate::store::OrderStore;

pub const STATUS_COMPLETE: &str = "COMPLETE";

/// What a callback did. The provider is acknowledged the same way for all
/// of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Applied,
    AlreadyPaid,
    UnknownOrder,
    Ignored,
    StoreFailed,
}

pub struct PaymentNotificationHandler {
    store: Arc<dyn OrderStore>,
    gateway: Arc<PayfastGateway>,
    notifier: Arc<NotificationDispatcher>,
    templates: MessageTemplates,
}

impl PaymentNotificationHandler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<PayfastGateway>,
        notifier: Arc<NotificationDispatcher>,
        templates: MessageTemplates,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            templates,
        }
    }

    /// Applies a settlement callback. Only a bad signature or a malformed
    /// `COMPLETE` callback is an error; everything else is acknowledged.
    pub async fn handle(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<CallbackOutcome, OrderError> {
        if !self.gateway.verify(fields) {
            match self.gateway.signature_policy() {
                SignaturePolicy::Enforce => {
                    warn!(
                        m_payment_id = fields.get("m_payment_id").map(String::as_str),
                        "payment callback rejected: invalid signature"
                    );
                    return Err(OrderError::SignatureInvalid);
                }
                SignaturePolicy::WarnOnly => {
                    warn!("payment callback signature invalid, processing anyway");
                }
            }
        }

        let payment_status = fields
            .get("payment_status")
            .map(|s| s.trim())
            .unwrap_or_default();
        if payment_status != STATUS_COMPLETE {
            info!(payment_status, "payment callback ignored");
            return Ok(CallbackOutcome::Ignored);
        }

        let order_number = fields
            .get("m_payment_id")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OrderError::invalid("m_payment_id is required"))?;
        let amount = fields
            .get("amount_gross")
            .and_then(|s| BigDecimal::from_str(s.trim()).ok())
            .filter(|amount| *amount > BigDecimal::zero())
            .ok_or_else(|| OrderError::invalid("amount_gross is missing or invalid"))?;

        match self
            .store
            .apply_payment(order_number, &amount, PAYFAST_SOURCE)
            .await
        {
            Ok(None) => {
                warn!(order_number, "payment callback for unknown order");
                Ok(CallbackOutcome::UnknownOrder)
            }
            Ok(Some(applied)) if applied.previous_status == OrderStatus::Paid => {
                info!(order_number, "repeated payment callback");
                Ok(CallbackOutcome::AlreadyPaid)
            }
            Ok(Some(applied)) => {
                info!(
                    order_number,
                    %amount,
                    previous_status = %applied.previous_status,
                    "payment applied"
                );
                self.send_payment_confirmation(&applied.order).await;
                Ok(CallbackOutcome::Applied)
            }
            Err(err) => {
                error!(order_number, error = ?err, "failed to apply payment");
                Ok(CallbackOutcome::StoreFailed)
            }
        }
    }

    async fn send_payment_confirmation(&self, order: &Order) {
        let amount = &order.total_amount;
        let email = async {
            if let Some(address) = &order.email {
                let message = self
                    .templates
                    .payment_confirmation_email(&order.order_number, amount);
                self.notifier
                    .send_email(address, &message.subject, &message.html)
                    .await;
            }
        };
        let sms = async {
            if let Some(phone) = &order.phone {
                let text = self
                    .templates
                    .payment_confirmation_sms(&order.order_number, amount);
                self.notifier.send_sms(phone, &text).await;
            }
        };
        tokio::join!(email, sms);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::models::{NewOrder, NewOrderItem};
    use crate::notify::{RecordingTransport, SentMessage};
    use crate::payfast::{signature, PayfastConfig};
    use crate::store::InMemoryOrderStore;

    const PASSPHRASE: &str = "jt7NOE43FZPn";

    struct Fixture {
        store: Arc<InMemoryOrderStore>,
        transport: Arc<RecordingTransport>,
        handler: PaymentNotificationHandler,
    }

    fn fixture(policy: SignaturePolicy) -> Fixture {
        let store = Arc::new(InMemoryOrderStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let gateway = Arc::new(PayfastGateway::new(PayfastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: "46f0cd694581a".to_string(),
            passphrase: PASSPHRASE.to_string(),
            signature_policy: policy,
        }));
        let notifier = Arc::new(NotificationDispatcher::new(
            transport.clone(),
            transport.clone(),
            Duration::from_secs(1),
        ));
        let handler = PaymentNotificationHandler::new(
            store.clone(),
            gateway,
            notifier,
            MessageTemplates::default(),
        );
        Fixture {
            store,
            transport,
            handler,
        }
    }

    async fn pending_order(store: &InMemoryOrderStore, number: &str) {
        store
            .create_order(
                NewOrder {
                    order_number: number.to_string(),
                    email: Some("guest@example.com".to_string()),
                    phone: Some("+27821234567".to_string()),
                    total_amount: BigDecimal::from(100),
                    status: OrderStatus::Pending,
                    created_at: Utc::now(),
                },
                vec![NewOrderItem {
                    item_name: "Burger".to_string(),
                    quantity: 2,
                    price: BigDecimal::from(50),
                    extras: None,
                    size: None,
                    piece_option: None,
                }],
                PAYFAST_SOURCE,
            )
            .await
            .unwrap();
    }

    fn signed(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sig = signature(&fields, PASSPHRASE);
        fields.insert("signature".to_string(), sig);
        fields
    }

    fn complete(number: &str, amount: &str) -> BTreeMap<String, String> {
        signed(&[
            ("payment_status", "COMPLETE"),
            ("m_payment_id", number),
            ("amount_gross", amount),
        ])
    }

    #[tokio::test]
    async fn complete_callback_marks_order_paid() {
        let f = fixture(SignaturePolicy::Enforce);
        pending_order(&f.store, "AB12CD34").await;

        let outcome = f.handler.handle(&complete("AB12CD34", "99.50")).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied);

        let stored = f.store.find_order("AB12CD34").await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Paid);
        assert_eq!(stored.order.total_amount, "99.50".parse::<BigDecimal>().unwrap());

        let sent = f.transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.contains(&SentMessage::Sms {
            to: "+27821234567".to_string(),
            body: "Payment received for order #AB12CD34. Amount: R99.50".to_string(),
        }));
    }

    #[tokio::test]
    async fn repeated_callback_is_idempotent() {
        let f = fixture(SignaturePolicy::Enforce);
        pending_order(&f.store, "AB12CD34").await;
        let callback = complete("AB12CD34", "99.50");

        f.handler.handle(&callback).await.unwrap();
        let first = f.store.find_order("AB12CD34").await.unwrap().unwrap();
        let outcome = f.handler.handle(&callback).await.unwrap();
        let second = f.store.find_order("AB12CD34").await.unwrap().unwrap();

        assert_eq!(outcome, CallbackOutcome::AlreadyPaid);
        assert_eq!(first, second);
        assert_eq!(f.transport.sent().len(), 2);
        assert_eq!(f.store.status_history("AB12CD34").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let f = fixture(SignaturePolicy::Enforce);
        let outcome = f.handler.handle(&complete("ZZZZZZZZ", "10.00")).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::UnknownOrder);
        assert!(f.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn other_statuses_are_ignored() {
        let f = fixture(SignaturePolicy::Enforce);
        pending_order(&f.store, "AB12CD34").await;
        let callback = signed(&[
            ("payment_status", "CANCELLED"),
            ("m_payment_id", "AB12CD34"),
            ("amount_gross", "99.50"),
        ]);

        let outcome = f.handler.handle(&callback).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Ignored);
        let stored = f.store.find_order("AB12CD34").await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_when_enforced() {
        let f = fixture(SignaturePolicy::Enforce);
        pending_order(&f.store, "AB12CD34").await;
        let mut callback = complete("AB12CD34", "99.50");
        callback.insert("amount_gross".to_string(), "1.00".to_string());

        let err = f.handler.handle(&callback).await.unwrap_err();
        assert!(matches!(err, OrderError::SignatureInvalid));
        let stored = f.store.find_order("AB12CD34").await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);

        callback.remove("signature");
        assert!(matches!(
            f.handler.handle(&callback).await,
            Err(OrderError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn bad_signature_is_processed_when_warning_only() {
        let f = fixture(SignaturePolicy::WarnOnly);
        pending_order(&f.store, "AB12CD34").await;
        let mut callback = complete("AB12CD34", "99.50");
        callback.insert("signature".to_string(), "0".repeat(32));

        let outcome = f.handler.handle(&callback).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied);
    }

    #[tokio::test]
    async fn malformed_complete_callback_is_invalid() {
        let f = fixture(SignaturePolicy::Enforce);
        let missing_id = signed(&[("payment_status", "COMPLETE"), ("amount_gross", "10.00")]);
        assert!(matches!(
            f.handler.handle(&missing_id).await,
            Err(OrderError::InvalidRequest(_))
        ));

        let bad_amount = complete("AB12CD34", "ten");
        assert!(matches!(
            f.handler.handle(&bad_amount).await,
            Err(OrderError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn store_failure_is_acknowledged() {
        let f = fixture(SignaturePolicy::Enforce);
        f.store.set_unavailable(true);
        let outcome = f.handler.handle(&complete("AB12CD34", "99.50")).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::StoreFailed);
    }
}
