//! WhatsApp Cloud API types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing message request for `POST /{phone_number_id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplatePayload>,
}

impl SendMessageRequest {
    fn new(to: String, kind: MessageKind) -> Self {
        Self {
            messaging_product: "whatsapp".into(),
            to,
            kind,
            text: None,
            image: None,
            template: None,
        }
    }

    /// Freeform text message.
    pub fn text(to: impl Into<String>, body: impl Into<String>) -> Self {
        let mut request = Self::new(to.into(), MessageKind::Text);
        request.text = Some(TextBody { body: body.into() });
        request
    }

    /// Image message referenced by public link.
    pub fn image(to: impl Into<String>, link: impl Into<String>, caption: Option<String>) -> Self {
        let mut request = Self::new(to.into(), MessageKind::Image);
        request.image = Some(ImageBody {
            link: link.into(),
            caption: caption.unwrap_or_default(),
        });
        request
    }

    /// Template message.
    pub fn template(to: impl Into<String>, template: &TemplateMessage) -> Self {
        let mut request = Self::new(to.into(), MessageKind::Template);
        request.template = Some(template.to_payload());
        request
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Template,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageBody {
    pub link: String,
    pub caption: String,
}

/// Wire form of a template reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplatePayload {
    pub name: String,
    pub language: Language,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub code: String,
}

/// Template component carrying positional parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Component {
    Body {
        parameters: Vec<Parameter>,
    },
    Button {
        sub_type: String,
        index: u32,
        parameters: Vec<Parameter>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Parameter {
    Text { text: String },
}

impl Parameter {
    pub fn text(value: impl Into<String>) -> Self {
        Parameter::Text { text: value.into() }
    }
}

/// Kind of dynamic button attached to a template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    /// Authentication "copy code" button. The Cloud API addresses it as a url button.
    CopyCode,
    Url,
    QuickReply,
}

impl ButtonKind {
    /// The `sub_type` the Cloud API expects for this button.
    pub fn sub_type(&self) -> &'static str {
        match self {
            ButtonKind::CopyCode | ButtonKind::Url => "url",
            ButtonKind::QuickReply => "quick_reply",
        }
    }
}

/// Button parameter for the first (index 0) template button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateButton {
    pub kind: ButtonKind,
    pub value: String,
}

impl TemplateButton {
    pub fn copy_code(code: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::CopyCode,
            value: code.into(),
        }
    }

    pub fn url(suffix: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::Url,
            value: suffix.into(),
        }
    }
}

/// A template send before it is bound to a recipient.
///
/// Body parameters are positional; the caller is responsible for matching the
/// slot order registered with the provider. Nothing here checks counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    pub body_parameters: Vec<String>,
    pub button: Option<TemplateButton>,
}

impl TemplateMessage {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            body_parameters: Vec::new(),
            button: None,
        }
    }

    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_button(mut self, button: Option<TemplateButton>) -> Self {
        self.button = button;
        self
    }

    /// Build the component list: a body component when there are parameters,
    /// then at most one button component at index 0.
    pub fn components(&self) -> Vec<Component> {
        let mut components = Vec::new();

        if !self.body_parameters.is_empty() {
            components.push(Component::Body {
                parameters: self
                    .body_parameters
                    .iter()
                    .map(|p| Parameter::text(p.as_str()))
                    .collect(),
            });
        }

        if let Some(button) = &self.button {
            components.push(Component::Button {
                sub_type: button.kind.sub_type().to_string(),
                index: 0,
                parameters: vec![Parameter::text(button.value.as_str())],
            });
        }

        components
    }

    pub fn to_payload(&self) -> TemplatePayload {
        TemplatePayload {
            name: self.name.clone(),
            language: Language {
                code: self.language.clone(),
            },
            components: self.components(),
        }
    }
}

/// Provider reply, kept verbatim for the caller to log or pass on.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    /// Whether the provider accepted the message.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.body.get("error").is_none()
    }

    /// Message id assigned by the provider, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.body
            .get("messages")?
            .get(0)?
            .get("id")?
            .as_str()
    }
}

/// Page of templates registered on the business account.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageTemplateList {
    #[serde(default)]
    pub data: Vec<ProviderTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
}

/// Template as registered with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTemplate {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub components: Vec<Value>,
}
