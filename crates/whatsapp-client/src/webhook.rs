//! Inbound webhook payloads delivered by the Cloud API.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<MessageStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub phone_number_id: Option<String>,
    pub display_phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<InboundText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundText {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// What the first change of a webhook delivery describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Message {
        phone_number_id: Option<String>,
        from: String,
        body: Option<String>,
    },
    Status {
        id: String,
        status: String,
    },
    Other,
}

impl WebhookPayload {
    /// Classify the first change of the first entry.
    pub fn first_event(&self) -> WebhookEvent {
        let Some(value) = self
            .entry
            .first()
            .and_then(|e| e.changes.first())
            .map(|c| &c.value)
        else {
            return WebhookEvent::Other;
        };

        if let Some(message) = value.messages.first() {
            return WebhookEvent::Message {
                phone_number_id: value
                    .metadata
                    .as_ref()
                    .and_then(|m| m.phone_number_id.clone()),
                from: message.from.clone(),
                body: message.text.as_ref().map(|t| t.body.clone()),
            };
        }

        if let Some(status) = value.statuses.first() {
            return WebhookEvent::Status {
                id: status.id.clone(),
                status: status.status.clone(),
            };
        }

        WebhookEvent::Other
    }
}
