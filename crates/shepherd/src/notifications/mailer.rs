use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::EmailConfig;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendered transactional email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound email hook; implementations decide how the message leaves the process.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;
}

/// SendGrid v3 mail-send adapter.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from_email: String, from_name: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|err| MailError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_key,
            from_email,
            from_name,
            endpoint: SENDGRID_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, email: &OutboundEmail) -> serde_json::Value {
        let mut recipient = json!({ "email": email.to });
        if let Some(name) = &email.to_name {
            recipient["name"] = json!(name);
        }

        json!({
            "personalizations": [{ "to": [recipient] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html }],
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&email))
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %email.to, "email accepted by provider");
        Ok(())
    }
}

/// Used when no provider key is configured: the message is logged, not sent.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "email delivery disabled; message logged");
        Ok(())
    }
}

/// Transport chosen from configuration at startup.
pub enum ConfiguredMailer {
    SendGrid(SendGridMailer),
    Log(LogMailer),
}

impl ConfiguredMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, MailError> {
        match &config.sendgrid_api_key {
            Some(key) => Ok(Self::SendGrid(SendGridMailer::new(
                key.clone(),
                config.from_email.clone(),
                config.from_name.clone(),
            )?)),
            None => {
                tracing::warn!("SENDGRID_API_KEY not set; notification emails will only be logged");
                Ok(Self::Log(LogMailer))
            }
        }
    }
}

#[async_trait]
impl Mailer for ConfiguredMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        match self {
            ConfiguredMailer::SendGrid(mailer) => mailer.send(email).await,
            ConfiguredMailer::Log(mailer) => mailer.send(email).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sendgrid_payload_carries_sender_recipient_and_html() {
        let mailer = SendGridMailer::new(
            "key".to_string(),
            "noreply@church.test".to_string(),
            "Church".to_string(),
        )
        .expect("client builds");
        let payload = mailer.payload(&OutboundEmail {
            to: "member@church.test".to_string(),
            to_name: Some("Ada Bassey".to_string()),
            subject: "We Miss You!".to_string(),
            html: "<p>hello</p>".to_string(),
        });

        assert_eq!(payload["from"]["email"], "noreply@church.test");
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "member@church.test");
        assert_eq!(payload["personalizations"][0]["to"][0]["name"], "Ada Bassey");
        assert_eq!(payload["content"][0]["type"], "text/html");
        assert_eq!(payload["subject"], "We Miss You!");
    }

    #[test]
    fn missing_api_key_selects_log_transport() {
        let config = EmailConfig {
            sendgrid_api_key: None,
            from_email: "noreply@church.test".to_string(),
            from_name: "Church".to_string(),
        };
        assert!(matches!(
            ConfiguredMailer::from_config(&config),
            Ok(ConfiguredMailer::Log(_))
        ));
    }
}
