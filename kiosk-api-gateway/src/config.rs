//! Gateway configuration, read once at startup and shared read-only.

use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use kiosk_order_service::BoxError;
use kiosk_order_service::notify::{
    DEFAULT_NOTIFICATION_TIMEOUT, MessageTemplates, SENDGRID_API_BASE, SendgridConfig,
    TWILIO_API_BASE, TwilioConfig,
};
use kiosk_order_service::payfast::{PayfastConfig, SignaturePolicy};
use kiosk_order_service::payments::stripe::{STRIPE_API_BASE, StripeConfig};

const DEVELOPMENT: &str = "development";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl: TimeDelta,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_pool_size: usize,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub payfast: PayfastConfig,
    /// `None` means messages are logged instead of delivered.
    pub twilio: Option<TwilioConfig>,
    pub sendgrid: Option<SendgridConfig>,
    pub notification_timeout: Duration,
    pub provider_timeout: Duration,
    pub storefront: MessageTemplates,
}

struct Vars<F> {
    lookup: F,
    environment: String,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, BoxError> {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|_| BoxError::from(format!("{name} has an invalid value `{raw}`"))),
            None => Ok(default),
        }
    }

    fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT
    }

    /// Must be set outside development. In development a placeholder is used.
    fn secret(&self, name: &str) -> Result<String, BoxError> {
        match self.get(name) {
            Some(value) => Ok(value),
            None if self.is_development() => Ok(format!("dev-{name}-not-for-production")),
            None => Err(format!("{name} must be set in {} environment", self.environment).into()),
        }
    }

    /// Provider credentials that may be left out entirely in development.
    fn optional_group(&self, names: &[&str]) -> Result<Option<Vec<String>>, BoxError> {
        if self.is_development() && names.iter().any(|name| self.get(name).is_none()) {
            return Ok(None);
        }
        names
            .iter()
            .map(|name| self.secret(name))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEVELOPMENT.to_string());
        let vars = Vars {
            lookup,
            environment,
        };

        let provider_timeout = Duration::from_secs(vars.parse_or("PROVIDER_TIMEOUT_SECS", 10)?);
        let notification_timeout = vars
            .parse_or(
                "NOTIFICATION_TIMEOUT_SECS",
                DEFAULT_NOTIFICATION_TIMEOUT.as_secs(),
            )
            .map(Duration::from_secs)?;

        let twilio = vars
            .optional_group(&["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_PHONE_NUMBER"])?
            .map(|values| TwilioConfig {
                account_sid: values[0].clone(),
                auth_token: values[1].clone(),
                from_number: values[2].clone(),
                api_base: vars.or("TWILIO_API_BASE", TWILIO_API_BASE),
            });
        let sendgrid = vars
            .optional_group(&["SENDGRID_API_KEY", "SENDGRID_FROM_EMAIL"])?
            .map(|values| SendgridConfig {
                api_key: values[0].clone(),
                from_email: values[1].clone(),
                api_base: vars.or("SENDGRID_API_BASE", SENDGRID_API_BASE),
            });

        Ok(Self {
            database_url: vars.get("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            database_pool_size: vars.parse_or("DATABASE_POOL_SIZE", 10)?,
            http_port: vars.parse_or("HTTP_PORT", 5000)?,
            cors_allowed_origins: vars
                .or("CORS_ALLOWED_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            auth: AuthConfig {
                jwt_secret: vars.secret("JWT_SECRET_KEY")?,
                access_token_ttl: TimeDelta::hours(vars.parse_or("ACCESS_TOKEN_TTL_HOURS", 24)?),
            },
            stripe: StripeConfig {
                secret_key: vars.secret("STRIPE_SECRET_KEY")?,
                currency: vars.or("CURRENCY", "zar").to_lowercase(),
                api_base: vars.or("STRIPE_API_BASE", STRIPE_API_BASE),
                timeout: provider_timeout,
            },
            payfast: PayfastConfig {
                merchant_id: vars.secret("PAYFAST_MERCHANT_ID")?,
                merchant_key: vars.secret("PAYFAST_MERCHANT_KEY")?,
                passphrase: vars.get("PAYFAST_PASSPHRASE").unwrap_or_default(),
                signature_policy: match vars.get("PAYFAST_SIGNATURE_POLICY") {
                    Some(raw) => raw.parse::<SignaturePolicy>()?,
                    None => SignaturePolicy::default(),
                },
            },
            twilio,
            sendgrid,
            notification_timeout,
            provider_timeout,
            storefront: MessageTemplates {
                store_name: vars.or("STORE_NAME", "KIOSK"),
                currency_symbol: vars.or("CURRENCY_SYMBOL", "R"),
            },
            environment: vars.environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT
    }
}
