//! Card payment intents over the Stripe REST API.

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;
use tracing::{info, warn};

use super::{PaymentError, PaymentIntent, PaymentIntentIssuer};
use crate::money::to_minor_units;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub currency: String,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct StripeClient {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentIntentIssuer for StripeClient {
    async fn create_intent(&self, amount: &BigDecimal) -> Result<PaymentIntent, PaymentError> {
        if *amount <= BigDecimal::zero() {
            return Err(PaymentError::InvalidAmount);
        }
        let cents = match to_minor_units(amount) {
            Some(cents) if cents > 0 => cents,
            _ => return Err(PaymentError::InvalidAmount),
        };

        let url = format!(
            "{}/v1/payment_intents",
            self.config.api_base.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(&[
                ("amount", cents.to_string()),
                ("currency", self.config.currency.clone()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("status {status}"));
            warn!(%status, %message, "payment intent rejected");
            return Err(PaymentError::Provider(message));
        }

        let intent: IntentResponse = resp.json().await?;
        info!(intent_id = %intent.id, amount = cents, "payment intent created");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}
