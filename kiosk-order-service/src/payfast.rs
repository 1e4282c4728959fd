//! Redirect payments: signed field maps for the hosted checkout page, and
//! verification of the asynchronous settlement callback.

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::money::format_amount;

pub const SIGNATURE_FIELD: &str = "signature";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Reject callbacks whose signature does not match.
    #[default]
    Enforce,
    /// Log mismatches and process the callback anyway.
    WarnOnly,
}

#[derive(Debug, Error)]
#[error("unknown signature policy `{0}`, expected `enforce` or `warn`")]
pub struct UnknownSignaturePolicy(String);

impl FromStr for SignaturePolicy {
    type Err = UnknownSignaturePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(SignaturePolicy::Enforce),
            "warn" => Ok(SignaturePolicy::WarnOnly),
            _ => Err(UnknownSignaturePolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayfastConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    pub passphrase: String,
    pub signature_policy: SignaturePolicy,
}

/// Signs a field map: keys in order, `key=value` joined with `&`, the
/// passphrase appended when set, MD5 as lowercase hex. Every field except the
/// signature itself is signed, empty values included.
pub fn signature(fields: &BTreeMap<String, String>, passphrase: &str) -> String {
    hex::encode(digest(fields, passphrase))
}

fn digest(fields: &BTreeMap<String, String>, passphrase: &str) -> Vec<u8> {
    let mut canonical = fields
        .iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    if !passphrase.is_empty() {
        canonical.push_str("&passphrase=");
        canonical.push_str(passphrase);
    }
    Md5::digest(canonical.as_bytes()).to_vec()
}

pub struct PayfastGateway {
    config: PayfastConfig,
}

impl PayfastGateway {
    pub fn new(config: PayfastConfig) -> Self {
        Self { config }
    }

    pub fn signature_policy(&self) -> SignaturePolicy {
        self.config.signature_policy
    }

    /// Fields the storefront posts to the hosted payment page. The payment id
    /// is the order number, so the callback can find the order.
    pub fn build_redirect_payment(
        &self,
        amount: &BigDecimal,
        base_url: &str,
        order_number: &str,
    ) -> BTreeMap<String, String> {
        let base = base_url.trim_end_matches('/');
        let mut fields = BTreeMap::from([
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            ("merchant_key".to_string(), self.config.merchant_key.clone()),
            ("return_url".to_string(), format!("{base}/payment/success")),
            ("cancel_url".to_string(), format!("{base}/payment/cancel")),
            ("notify_url".to_string(), format!("{base}/api/payment/notify")),
            ("m_payment_id".to_string(), order_number.to_string()),
            ("amount".to_string(), format_amount(amount)),
            (
                "item_name".to_string(),
                format!("Restaurant Order #{order_number}"),
            ),
        ]);
        let signed = signature(&fields, &self.config.passphrase);
        fields.insert(SIGNATURE_FIELD.to_string(), signed);
        fields
    }

    /// True when the callback carries a signature matching its other fields.
    pub fn verify(&self, fields: &BTreeMap<String, String>) -> bool {
        match fields.get(SIGNATURE_FIELD) {
            Some(received) => match hex::decode(received.trim()) {
                Ok(received) => {
                    let expected = digest(fields, &self.config.passphrase);
                    expected.as_slice().ct_eq(received.as_slice()).into()
                }
                Err(_) => false,
            },
            None => false,
        }
    }
}
