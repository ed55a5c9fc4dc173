//! API request and response types.

use crate::mailer::EmailOutcome;
use member_store::{NotificationSettings, TemplateRecord};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use whatsapp_client::ProviderTemplate;

/// Accept a string or a number; anything else reads as absent.
///
/// Admin forms post phone numbers and membership ids either way.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Present and non-empty.
pub fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Request to send an OTP.
#[derive(Debug, Default, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub membership_id: Option<String>,
}

/// Request to verify an OTP.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
}

/// Request to notify a member of approval.
#[derive(Debug, Default, Deserialize)]
pub struct NotifyApprovalRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub membership_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// Request to confirm a registration.
#[derive(Debug, Default, Deserialize)]
pub struct SendRegistrationRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub membership_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Download quota check or record.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub membership_id: Option<String>,
}

/// Raw template send, shaped like the provider's own payload.
#[derive(Debug, Default, Deserialize)]
pub struct SendTemplateRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<LanguageRef>,
    #[serde(default)]
    pub components: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LanguageRef {
    #[serde(default)]
    pub code: Option<String>,
}

impl TemplateRef {
    /// Text of each parameter in the `body` component. A parameter without
    /// text falls back to its `payload.url`, then to an empty string.
    pub fn body_parameters(&self) -> Vec<String> {
        let Some(body) = self
            .components
            .iter()
            .find(|c| c.get("type").and_then(Value::as_str) == Some("body"))
        else {
            return Vec::new();
        };

        body.get("parameters")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .map(|p| {
                        p.get("text")
                            .and_then(Value::as_str)
                            .filter(|t| !t.is_empty())
                            .or_else(|| p.pointer("/payload/url").and_then(Value::as_str))
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Registration acknowledgement email.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Approval email.
#[derive(Debug, Default, Deserialize)]
pub struct ApprovalEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub membership_id: Option<String>,
}

/// Card layout save.
#[derive(Debug, Default, Deserialize)]
pub struct SaveCardTemplateRequest {
    #[serde(default)]
    pub template: Option<Value>,
}

/// Result of a template send.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub template: String,
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Returned with 200 when a notification is switched off.
#[derive(Debug, Serialize)]
pub struct SkippedResponse {
    pub success: bool,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub success: bool,
    pub template: String,
    #[serde(rename = "textResult")]
    pub text_result: Value,
    #[serde(rename = "emailResult")]
    pub email_result: EmailOutcome,
}

#[derive(Debug, Serialize)]
pub struct DownloadCheckResponse {
    pub success: bool,
    pub allowed: bool,
    #[serde(rename = "downloadsThisWeek")]
    pub downloads_this_week: usize,
    pub limit: u32,
}

/// Templates grouped by type.
#[derive(Debug, Default, Serialize)]
pub struct GroupedTemplates {
    pub approval: Vec<TemplateRecord>,
    pub otp: Vec<TemplateRecord>,
    pub registration: Vec<TemplateRecord>,
    pub custom: Vec<TemplateRecord>,
}

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub success: bool,
    pub templates: GroupedTemplates,
    pub all: BTreeMap<String, TemplateRecord>,
}

#[derive(Debug, Serialize)]
pub struct TemplatesByTypeResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub templates: Vec<TemplateRecord>,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub success: bool,
    pub template: TemplateRecord,
}

#[derive(Debug, Serialize)]
pub struct ProviderTemplatesResponse {
    pub success: bool,
    pub templates: Vec<ProviderTemplate>,
}

#[derive(Debug, Serialize)]
pub struct SendTemplateResponse {
    pub success: bool,
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: NotificationSettings,
}

#[derive(Debug, Serialize)]
pub struct EmailSentResponse {
    pub success: bool,
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub success: bool,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub pending_otps: usize,
    pub templates: usize,
    pub whatsapp_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_fields_accepted_as_strings() {
        let req: VerifyOtpRequest =
            serde_json::from_value(json!({"phone": 3001234567u64, "code": 42})).unwrap();
        assert_eq!(req.phone.as_deref(), Some("3001234567"));
        assert_eq!(req.code.as_deref(), Some("42"));

        let req: DownloadRequest = serde_json::from_value(json!({"membership_id": null})).unwrap();
        assert!(req.membership_id.is_none());
    }

    #[test]
    fn test_required_rejects_empty() {
        assert_eq!(required(&Some("x".into())), Some("x"));
        assert_eq!(required(&Some(String::new())), None);
        assert_eq!(required(&None), None);
    }

    #[test]
    fn test_body_parameters_extraction() {
        let template: TemplateRef = serde_json::from_value(json!({
            "name": "approved",
            "components": [
                {"type": "header", "parameters": [{"type": "text", "text": "ignored"}]},
                {"type": "body", "parameters": [
                    {"type": "text", "text": "Ali"},
                    {"type": "image", "payload": {"url": "https://example.org/card.png"}},
                    {"type": "text"}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(
            template.body_parameters(),
            vec!["Ali", "https://example.org/card.png", ""]
        );
    }

    #[test]
    fn test_body_parameters_without_body_component() {
        let template = TemplateRef::default();
        assert!(template.body_parameters().is_empty());
    }

    #[test]
    fn test_download_check_field_names() {
        let body = serde_json::to_value(DownloadCheckResponse {
            success: true,
            allowed: false,
            downloads_this_week: 1,
            limit: 1,
        })
        .unwrap();

        assert_eq!(body["downloadsThisWeek"], 1);
        assert_eq!(body["allowed"], false);
    }
}
