//! `Mailer` transports.

use std::time::Duration;

use async_trait::async_trait;
use domains::errors::{DomainError, Result};
use domains::models::OutgoingEmail;
use domains::ports::Mailer;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: [Address<'a>; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Posts each email as JSON to a transactional mail API, authenticated
/// with a bearer key when one is configured.
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
    from_address: String,
    from_name: String,
}

impl HttpMailer {
    pub fn new(
        api_url: &str,
        api_key: Option<SecretString>,
        from_address: &str,
        from_name: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DomainError::Internal(format!("mail client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key,
            from_address: from_address.to_string(),
            from_name: from_name.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = SendRequest {
            from: Address {
                email: &self.from_address,
                name: &self.from_name,
            },
            to: [Address {
                email: &email.to,
                name: &email.to_name,
            }],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };
        let mut request = self.http.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::External(format!("mail transport: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::External(format!(
                "mail transport returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }
        debug!(to = %email.to, %status, "email accepted by transport");
        Ok(())
    }
}

/// Writes emails to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "email (log transport)");
        debug!(body = %email.text);
        Ok(())
    }
}
