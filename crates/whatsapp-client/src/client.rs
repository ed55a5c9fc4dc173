//! WhatsApp Cloud API HTTP client.

use crate::error::WhatsAppError;
use crate::phone::{normalize_phone_number, DEFAULT_COUNTRY_CODE};
use crate::types::*;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Graph API host.
pub const DEFAULT_API_URL: &str = "https://graph.facebook.com";

/// Default Graph API version.
pub const DEFAULT_API_VERSION: &str = "v17.0";

/// WhatsApp Cloud API client.
///
/// The access token is stored using `SecretString` so it never shows up in
/// logs or debug output. A client without a token or sender phone number id
/// is still constructible; every send then fails with
/// [`WhatsAppError::NotConfigured`] instead of touching the network.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    api_version: String,
    token: Option<SecretString>,
    phone_number_id: Option<String>,
    business_account_id: Option<String>,
    country_code: String,
}

impl WhatsAppClient {
    /// Create a new client. Every request is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WhatsAppError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            token: None,
            phone_number_id: None,
            business_account_id: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        })
    }

    /// Set the access token and sender phone number id. Blank values count as absent.
    pub fn with_credentials(mut self, token: Option<String>, phone_number_id: Option<String>) -> Self {
        self.token = non_blank(token).map(SecretString::new);
        self.phone_number_id = non_blank(phone_number_id);
        self
    }

    /// Set the business account used for template listing.
    pub fn with_business_account(mut self, business_account_id: Option<String>) -> Self {
        self.business_account_id = non_blank(business_account_id);
        self
    }

    /// Set the country calling code used for national-format numbers.
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// Whether both token and sender id are present.
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.phone_number_id.is_some()
    }

    /// Normalize a phone number with this client's country code.
    pub fn normalize(&self, phone: &str) -> String {
        normalize_phone_number(phone, &self.country_code)
    }

    /// Send a template message.
    #[instrument(skip(self, template), fields(template_name = %template.name, language = %template.language))]
    pub async fn send_template(
        &self,
        phone: &str,
        template: &TemplateMessage,
    ) -> Result<ProviderResponse, WhatsAppError> {
        let request = SendMessageRequest::template(self.normalize(phone), template);
        self.send(&request).await
    }

    /// Send a freeform text message.
    #[instrument(skip(self, body))]
    pub async fn send_text(&self, phone: &str, body: &str) -> Result<ProviderResponse, WhatsAppError> {
        let request = SendMessageRequest::text(self.normalize(phone), body);
        self.send(&request).await
    }

    /// Send an image by public link.
    #[instrument(skip(self, caption))]
    pub async fn send_image(
        &self,
        phone: &str,
        link: &str,
        caption: Option<String>,
    ) -> Result<ProviderResponse, WhatsAppError> {
        let request = SendMessageRequest::image(self.normalize(phone), link, caption);
        self.send(&request).await
    }

    /// Post one message. The provider's reply is returned verbatim whatever its
    /// status; only transport failures become errors. No retry.
    async fn send(&self, request: &SendMessageRequest) -> Result<ProviderResponse, WhatsAppError> {
        let (token, phone_number_id) = match (&self.token, &self.phone_number_id) {
            (Some(token), Some(id)) => (token, id),
            _ => {
                warn!("WhatsApp credentials not configured");
                return Err(WhatsAppError::NotConfigured);
            }
        };

        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, phone_number_id
        );

        debug!(to = %request.to, kind = ?request.kind, "Sending WhatsApp message");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
        };

        if status.is_success() {
            debug!(to = %request.to, %status, "WhatsApp message accepted");
        } else {
            warn!(to = %request.to, %status, body = %body, "WhatsApp send failed");
        }

        Ok(ProviderResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// List templates registered on the business account.
    #[instrument(skip(self))]
    pub async fn list_message_templates(&self) -> Result<MessageTemplateList, WhatsAppError> {
        let (token, account) = match (&self.token, &self.business_account_id) {
            (Some(token), Some(account)) => (token, account),
            _ => return Err(WhatsAppError::NotConfigured),
        };

        let response = self
            .client
            .get(format!(
                "{}/{}/{}/message_templates",
                self.base_url, self.api_version, account
            ))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api { status, body });
        }

        let body = response.text().await?;
        let templates: MessageTemplateList = serde_json::from_str(&body)?;
        debug!("Listed {} provider templates", templates.data.len());
        Ok(templates)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
