//! Transactional email through an HTTP relay.

use crate::config::MailConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail relay rejected message: {status} - {body}")]
    Rejected { status: u16, body: String },
}

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// What the relay reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailReceipt {
    pub message_id: Option<String>,
}

/// Email result as reported inside API responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailOutcome {
    pub success: bool,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailOutcome {
    /// Placeholder used when no email was attempted.
    pub fn skipped() -> Self {
        Self {
            success: false,
            message_id: None,
            error: None,
        }
    }
}

impl From<Result<MailReceipt, MailError>> for EmailOutcome {
    fn from(result: Result<MailReceipt, MailError>) -> Self {
        match result {
            Ok(receipt) => Self {
                success: true,
                message_id: receipt.message_id,
                error: None,
            },
            Err(e) => Self {
                success: false,
                message_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, MailError>;
}

/// Mailer used when no relay is configured. Every send fails softly.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, MailError> {
        debug!(to = %message.to, subject = %message.subject, "Email disabled, skipping send");
        Err(MailError::NotConfigured)
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Posts each message as JSON to a relay endpoint with a bearer key.
pub struct HttpMailer {
    client: Client,
    url: String,
    api_key: Option<SecretString>,
    from: String,
}

impl HttpMailer {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()).map(SecretString::new),
            from: from.into(),
        })
    }

    /// Relay mailer for `config`, or `None` when no relay URL is set.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, MailError> {
        match config.api_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Some(Self::new(
                url,
                config.api_key.clone(),
                config.from.clone(),
                config.timeout,
            )?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, MailError> {
        let mut request = self.client.post(&self.url).json(&RelayRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Mail relay rejected message");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message_id = body
            .get("id")
            .or_else(|| body.get("messageId"))
            .and_then(Value::as_str)
            .map(String::from);

        info!(?message_id, "Email sent");
        Ok(MailReceipt { message_id })
    }
}

/// Acknowledgement sent after a member registers.
pub fn registration_email(to: &str, full_name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Registration received".to_string(),
        html: format!(
            "<p>Dear {full_name},</p>\
             <p>Thank you for registering. Your application is under review and we will \
             notify you once it has been approved.</p>"
        ),
        text: format!(
            "Dear {full_name},\n\nThank you for registering. Your application is under review \
             and we will notify you once it has been approved."
        ),
    }
}

/// Notice sent when an admin approves a membership.
pub fn approval_email(to: &str, full_name: &str, membership_id: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your membership has been approved".to_string(),
        html: format!(
            "<p>Dear {full_name},</p>\
             <p>Your membership has been approved.</p>\
             <p>Membership ID: <strong>{membership_id}</strong></p>"
        ),
        text: format!(
            "Dear {full_name},\n\nYour membership has been approved.\nMembership ID: {membership_id}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer(server: &MockServer) -> HttpMailer {
        HttpMailer::new(
            format!("{}/send", server.uri()),
            Some("mail-key".into()),
            "members@example.org",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_mailer_posts_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer mail-key"))
            .and(body_partial_json(serde_json::json!({
                "from": "members@example.org",
                "to": "ayesha@example.org",
                "subject": "Your membership has been approved"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "msg-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = mailer(&server)
            .send(&approval_email("ayesha@example.org", "Ayesha", "MSL-0042"))
            .await
            .unwrap();

        assert_eq!(receipt.message_id.as_deref(), Some("msg-1"));
    }

    #[tokio::test]
    async fn test_http_mailer_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
            .mount(&server)
            .await;

        let err = mailer(&server)
            .send(&registration_email("nobody", "Nobody"))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Rejected { status: 422, ref body } if body == "bad recipient"));
    }

    #[tokio::test]
    async fn test_disabled_mailer() {
        let result = DisabledMailer
            .send(&registration_email("a@example.org", "A"))
            .await;
        assert!(matches!(result, Err(MailError::NotConfigured)));

        let outcome = EmailOutcome::from(result);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Email service not configured"));
    }

    #[test]
    fn test_from_config_without_url() {
        let config = MailConfig::default();
        assert!(HttpMailer::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_approval_email_mentions_membership_id() {
        let email = approval_email("a@example.org", "Ali", "MSL-7");
        assert!(email.text.contains("MSL-7"));
        assert!(email.html.contains("Ali"));
    }
}
