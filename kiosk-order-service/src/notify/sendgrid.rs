use async_trait::async_trait;
use serde_json::json;

use super::{EmailTransport, NotifyError};

pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone)]
pub struct SendgridConfig {
    pub api_key: String,
    pub from_email: String,
    pub api_base: String,
}

/// HTML email through the SendGrid v3 mail send endpoint.
pub struct SendgridEmail {
    client: reqwest::Client,
    config: SendgridConfig,
}

impl SendgridEmail {
    pub fn new(client: reqwest::Client, config: SendgridConfig) -> Self {
        Self { client, config }
    }

    fn payload(&self, to: &str, subject: &str, html: &str) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.config.from_email },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html }],
        })
    }
}

#[async_trait]
impl EmailTransport for SendgridEmail {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/v3/mail/send",
            self.config.api_base.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(to, subject, html))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
