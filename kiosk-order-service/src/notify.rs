//! Best-effort customer notifications. Delivery problems are logged and
//! reported as `false`; they never fail the operation that triggered them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub mod messages;
pub mod sendgrid;
pub mod twilio;

pub use messages::MessageTemplates;
pub use sendgrid::{SENDGRID_API_BASE, SendgridConfig, SendgridEmail};
pub use twilio::{TWILIO_API_BASE, TwilioConfig, TwilioSms};

pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("transport request failed")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them. Used in
/// development when provider credentials are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl SmsTransport for LogTransport {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        info!(to, body, "sms (log only)");
        Ok(())
    }
}

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), NotifyError> {
        info!(to, subject, "email (log only)");
        Ok(())
    }
}

pub struct NotificationDispatcher {
    sms: Arc<dyn SmsTransport>,
    email: Arc<dyn EmailTransport>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        sms: Arc<dyn SmsTransport>,
        email: Arc<dyn EmailTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            sms,
            email,
            timeout,
        }
    }

    pub fn log_only() -> Self {
        Self::new(
            Arc::new(LogTransport),
            Arc::new(LogTransport),
            DEFAULT_NOTIFICATION_TIMEOUT,
        )
    }

    pub async fn send_sms(&self, to: &str, text: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.sms.send_sms(to, text)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "sms delivery failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "sms delivery timed out");
                false
            }
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.email.send_email(to, subject, html)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "email delivery failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "email delivery timed out");
                false
            }
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use recording::{RecordingTransport, SentMessage};

#[cfg(any(test, feature = "test-util"))]
mod recording {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{EmailTransport, NotifyError, SmsTransport};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SentMessage {
        Sms { to: String, body: String },
        Email { to: String, subject: String, html: String },
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum Behaviour {
        #[default]
        Deliver,
        Reject,
        Hang,
    }

    /// Captures every message; can be told to reject or to never answer.
    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<SentMessage>>,
        behaviour: Mutex<Behaviour>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rejecting() -> Self {
            let transport = Self::default();
            *transport.behaviour.lock().unwrap() = Behaviour::Reject;
            transport
        }

        pub fn hanging() -> Self {
            let transport = Self::default();
            *transport.behaviour.lock().unwrap() = Behaviour::Hang;
            transport
        }

        pub fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }

        async fn deliver(&self, message: SentMessage) -> Result<(), NotifyError> {
            let behaviour = *self.behaviour.lock().unwrap();
            match behaviour {
                Behaviour::Deliver => {
                    self.sent.lock().unwrap().push(message);
                    Ok(())
                }
                Behaviour::Reject => Err(NotifyError::Rejected {
                    status: 400,
                    body: "rejected".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    #[async_trait]
    impl SmsTransport for RecordingTransport {
        async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
            self.deliver(SentMessage::Sms {
                to: to.to_string(),
                body: body.to_string(),
            })
            .await
        }
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
            self.deliver(SentMessage::Email {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html.to_string(),
            })
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivered_messages_report_success() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher =
            NotificationDispatcher::new(transport.clone(), transport.clone(), Duration::from_secs(1));

        assert!(dispatcher.send_sms("+27000000000", "hello").await);
        assert!(dispatcher.send_email("a@example.com", "Hi", "<p>hi</p>").await);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn rejected_messages_report_failure() {
        let transport = Arc::new(RecordingTransport::rejecting());
        let dispatcher =
            NotificationDispatcher::new(transport.clone(), transport, Duration::from_secs(1));

        assert!(!dispatcher.send_sms("+27000000000", "hello").await);
        assert!(!dispatcher.send_email("a@example.com", "Hi", "<p>hi</p>").await);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_transports_are_cut_off() {
        let transport = Arc::new(RecordingTransport::hanging());
        let dispatcher =
            NotificationDispatcher::new(transport.clone(), transport, Duration::from_secs(5));

        assert!(!dispatcher.send_sms("+27000000000", "hello").await);
    }
}
