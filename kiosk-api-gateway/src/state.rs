use std::sync::Arc;

use kiosk_auth_service::{AdminStore, AuthService, PgAdminStore, TokenService};
use kiosk_menu_service::PgMenuStore;
use kiosk_order_service::notify::{
    EmailTransport, LogTransport, MessageTemplates, NotificationDispatcher, SendgridEmail,
    SmsTransport, TwilioSms,
};
use kiosk_order_service::order_number::{OrderNumberGenerator, RandomOrderNumbers};
use kiosk_order_service::payfast::{PayfastConfig, PayfastGateway};
use kiosk_order_service::payments::{PaymentIntentIssuer, StripeClient};
use kiosk_order_service::{
    BoxError, DbPool, OrderCompletionService, OrderStore, PaymentNotificationHandler, PgOrderStore,
};
use tracing::warn;

use crate::config::Config;

/// The collaborators the HTTP layer is wired from.
pub struct Services {
    pub orders: Arc<dyn OrderStore>,
    pub admins: Arc<dyn AdminStore>,
    pub menu: PgMenuStore,
    pub intents: Arc<dyn PaymentIntentIssuer>,
    pub notifier: Arc<NotificationDispatcher>,
    pub numbers: Arc<dyn OrderNumberGenerator>,
}

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<OrderCompletionService>,
    pub callbacks: Arc<PaymentNotificationHandler>,
    pub orders: Arc<dyn OrderStore>,
    pub payfast: Arc<PayfastGateway>,
    pub intents: Arc<dyn PaymentIntentIssuer>,
    pub auth: Arc<AuthService>,
    pub menu: PgMenuStore,
}

impl AppState {
    pub fn new(
        services: Services,
        payfast: PayfastConfig,
        templates: MessageTemplates,
        tokens: TokenService,
    ) -> Self {
        let payfast = Arc::new(PayfastGateway::new(payfast));
        let checkout = OrderCompletionService::new(
            services.orders.clone(),
            services.numbers,
            services.notifier.clone(),
            templates.clone(),
        );
        let callbacks = PaymentNotificationHandler::new(
            services.orders.clone(),
            payfast.clone(),
            services.notifier,
            templates,
        );

        Self {
            checkout: Arc::new(checkout),
            callbacks: Arc::new(callbacks),
            orders: services.orders,
            payfast,
            intents: services.intents,
            auth: Arc::new(AuthService::new(services.admins, tokens)),
            menu: services.menu,
        }
    }

    /// Production wiring: Postgres stores and the real payment and
    /// messaging providers.
    pub fn from_config(config: &Config, pool: DbPool) -> Result<Self, BoxError> {
        let services = Services {
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            admins: Arc::new(PgAdminStore::new(pool.clone())),
            menu: PgMenuStore::new(pool),
            intents: Arc::new(StripeClient::new(config.stripe.clone())?),
            notifier: Arc::new(notifier(config)?),
            numbers: Arc::new(RandomOrderNumbers),
        };
        Ok(Self::new(
            services,
            config.payfast.clone(),
            config.storefront.clone(),
            TokenService::new(&config.auth.jwt_secret, config.auth.access_token_ttl),
        ))
    }
}

fn notifier(config: &Config) -> Result<NotificationDispatcher, BoxError> {
    let client = reqwest::Client::builder()
        .timeout(config.provider_timeout)
        .build()?;

    let sms: Arc<dyn SmsTransport> = match &config.twilio {
        Some(twilio) => Arc::new(TwilioSms::new(client.clone(), twilio.clone())),
        None => {
            warn!("Twilio credentials not configured, SMS will only be logged");
            Arc::new(LogTransport)
        }
    };
    let email: Arc<dyn EmailTransport> = match &config.sendgrid {
        Some(sendgrid) => Arc::new(SendgridEmail::new(client, sendgrid.clone())),
        None => {
            warn!("SendGrid credentials not configured, email will only be logged");
            Arc::new(LogTransport)
        }
    };

    Ok(NotificationDispatcher::new(
        sms,
        email,
        config.notification_timeout,
    ))
}
