//! Template notifications on top of the WhatsApp client.

use member_store::TemplateRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use whatsapp_client::{TemplateMessage, WhatsAppClient, WhatsAppError};

/// Reply reported to callers when credentials are missing.
pub fn not_configured_result() -> Value {
    json!({ "error": WhatsAppError::NotConfigured.to_string() })
}

/// Sends registry-backed template messages.
///
/// Missing credentials are a soft failure: the send resolves to
/// [`not_configured_result`] instead of an error. Transport failures are
/// returned to the caller; nothing is retried.
#[derive(Clone)]
pub struct Notifier {
    whatsapp: Arc<WhatsAppClient>,
    templates: Arc<TemplateRegistry>,
}

impl Notifier {
    pub fn new(whatsapp: Arc<WhatsAppClient>, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            whatsapp,
            templates,
        }
    }

    pub fn whatsapp(&self) -> &WhatsAppClient {
        &self.whatsapp
    }

    /// Registered language of `template`, else `requested`, else `fallback`.
    pub async fn resolve_language(
        &self,
        template: &str,
        requested: Option<&str>,
        fallback: &str,
    ) -> String {
        if let Some(language) = self.templates.language_of(template).await {
            return language;
        }

        requested
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Send `message` to `phone` and return the provider reply verbatim.
    #[instrument(skip(self, message), fields(template = %message.name))]
    pub async fn send(&self, phone: &str, message: &TemplateMessage) -> Result<Value, WhatsAppError> {
        match self.whatsapp.send_template(phone, message).await {
            Ok(response) => {
                if response.is_success() {
                    info!(message_id = ?response.message_id(), "Template sent");
                } else {
                    warn!(status = response.status, body = %response.body, "Template send rejected");
                }
                Ok(response.body)
            }
            Err(WhatsAppError::NotConfigured) => {
                warn!("WhatsApp not configured, message skipped");
                Ok(not_configured_result())
            }
            Err(e) => Err(e),
        }
    }
}
