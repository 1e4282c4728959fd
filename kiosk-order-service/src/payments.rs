use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

pub mod stripe;

pub use stripe::{StripeClient, StripeConfig};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("payment provider error: {0}")]
    Provider(String),
    #[error("payment provider unreachable")]
    Transport(#[from] reqwest::Error),
}

/// The client-side secret the storefront uses to confirm a card payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentIntentIssuer: Send + Sync {
    async fn create_intent(&self, amount: &BigDecimal) -> Result<PaymentIntent, PaymentError>;
}

#[cfg(any(test, feature = "test-util"))]
pub use fixed::FixedIntentIssuer;

#[cfg(any(test, feature = "test-util"))]
mod fixed {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bigdecimal::{BigDecimal, Zero};

    use super::{PaymentError, PaymentIntent, PaymentIntentIssuer};

    /// Issues predictable intents and records the amounts it was asked for.
    #[derive(Default)]
    pub struct FixedIntentIssuer {
        failure: Option<String>,
        requested: Mutex<Vec<BigDecimal>>,
    }

    impl FixedIntentIssuer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                failure: Some(message.into()),
                ..Self::default()
            }
        }

        pub fn requested(&self) -> Vec<BigDecimal> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentIntentIssuer for FixedIntentIssuer {
        async fn create_intent(&self, amount: &BigDecimal) -> Result<PaymentIntent, PaymentError> {
            if *amount <= BigDecimal::zero() {
                return Err(PaymentError::InvalidAmount);
            }
            self.requested.lock().unwrap().push(amount.clone());
            if let Some(message) = &self.failure {
                return Err(PaymentError::Provider(message.clone()));
            }
            let n = self.requested.lock().unwrap().len();
            Ok(PaymentIntent {
                id: format!("pi_test_{n}"),
                client_secret: format!("pi_test_{n}_secret"),
            })
        }
    }
}
