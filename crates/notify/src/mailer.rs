//! Outbound email transport.
//!
//! Delivery goes through the Resend HTTP API; when no API key is configured
//! the [`NoopMailer`] stands in and email is silently disabled. Transport
//! failures are the caller's to log — they never abort notification
//! creation.

use async_trait::async_trait;

/// A fully composed email ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Abstraction over the mail transport so dispatch logic can be exercised
/// without a live provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether this transport can actually deliver mail. Dispatch skips the
    /// send entirely when this is false.
    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Resend HTTP API endpoint.
const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Mailer backed by the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: RESEND_API_URL.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "from": email.from,
            "to": [email.to],
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Resend API returned {}: {}", status, detail);
        }

        Ok(())
    }
}

/// Transport used when email delivery is not configured.
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    fn enabled(&self) -> bool {
        false
    }

    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        tracing::debug!(to = %email.to, subject = %email.subject, "Email delivery disabled, dropping message");
        Ok(())
    }
}
