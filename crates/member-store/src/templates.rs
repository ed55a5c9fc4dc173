//! Operator-managed registry of WhatsApp template metadata.

use crate::error::StoreError;
use crate::json_file::JsonStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Id of the system OTP template.
pub const OTP_TEMPLATE_ID: &str = "otp_verification";
/// Id of the system approval template.
pub const APPROVAL_TEMPLATE_ID: &str = "approved";
/// Id of the system registration template, spelled as registered with the provider.
pub const REGISTRATION_TEMPLATE_ID: &str = "memeber_register";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Approval,
    Otp,
    Registration,
    Custom,
}

impl TemplateType {
    pub const ALL: [TemplateType; 4] = [
        TemplateType::Approval,
        TemplateType::Otp,
        TemplateType::Registration,
        TemplateType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Approval => "approval",
            TemplateType::Otp => "otp",
            TemplateType::Registration => "registration",
            TemplateType::Custom => "custom",
        }
    }

    /// Parse a type name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template metadata. `id` matches the template name registered with the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TemplateType,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Display fields the admin UI attaches that the service does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update. Absent fields are left unchanged; `id` is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<TemplateType>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateRecord {
    fn apply(&mut self, update: TemplateUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        if update.category.is_some() {
            self.category = update.category;
        }
        if update.body.is_some() {
            self.body = update.body;
        }
        if let Some(parameters) = update.parameters {
            self.parameters = parameters;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        for (key, value) in update.extra {
            if key == "id" || key == "updated_at" {
                continue;
            }
            self.extra.insert(key, value);
        }
        self.updated_at = Some(now);
    }
}

fn system_template(
    id: &str,
    name: &str,
    kind: TemplateType,
    language: &str,
    category: &str,
    body: &str,
    parameters: &[&str],
) -> TemplateRecord {
    TemplateRecord {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        language: language.to_string(),
        category: Some(category.to_string()),
        body: Some(body.to_string()),
        parameters: parameters.iter().map(|p| p.to_string()).collect(),
        description: None,
        updated_at: None,
        extra: Map::new(),
    }
}

/// The three templates the service sends itself.
pub fn default_templates() -> BTreeMap<String, TemplateRecord> {
    [
        system_template(
            OTP_TEMPLATE_ID,
            "OTP Verification",
            TemplateType::Otp,
            "en_US",
            "AUTHENTICATION",
            "{{1}} is your verification code for {{2}}. It expires in {{3}}. Need help? Call {{4}}.",
            &["code", "card_label", "validity", "support_contact"],
        ),
        system_template(
            APPROVAL_TEMPLATE_ID,
            "Membership Approved",
            TemplateType::Approval,
            "en",
            "UTILITY",
            "Dear {{1}}, your membership has been approved. Your membership ID is {{2}}.",
            &["first_name", "membership_id"],
        ),
        system_template(
            REGISTRATION_TEMPLATE_ID,
            "Member Registration",
            TemplateType::Registration,
            "en_US",
            "UTILITY",
            "Dear {{1}}, thank you for registering. Your reference number is {{2}}.",
            &["first_name", "membership_id"],
        ),
    ]
    .into_iter()
    .map(|t| (t.id.clone(), t))
    .collect()
}

/// Template id → record, persisted as one JSON object.
///
/// The set of ids is fixed; only in-place updates are accepted.
pub struct TemplateRegistry {
    state: RwLock<RegistryState>,
    store: JsonStore,
}

struct RegistryState {
    templates: BTreeMap<String, TemplateRecord>,
    /// Stored entries that do not parse as records. Written back untouched.
    unparsed: Map<String, Value>,
    /// The stored document was unreadable and the system templates stand in
    /// for it. Nothing is persisted in this mode.
    fallback: bool,
}

impl RegistryState {
    fn seeded(fallback: bool) -> Self {
        Self {
            templates: default_templates(),
            unparsed: Map::new(),
            fallback,
        }
    }

    fn from_document(document: Map<String, Value>) -> Self {
        let mut templates = BTreeMap::new();
        let mut unparsed = Map::new();

        for (id, raw) in document {
            match serde_json::from_value::<TemplateRecord>(raw.clone()) {
                Ok(record) => {
                    templates.insert(id, record);
                }
                Err(e) => {
                    warn!(template = %id, "Keeping unreadable template record as stored: {}", e);
                    unparsed.insert(id, raw);
                }
            }
        }

        Self {
            templates,
            unparsed,
            fallback: false,
        }
    }

    /// Full document with `templates` in place of the parsed records.
    fn document(
        &self,
        templates: &BTreeMap<String, TemplateRecord>,
    ) -> Result<Map<String, Value>, StoreError> {
        let mut document = self.unparsed.clone();
        for (id, record) in templates {
            document.insert(id.clone(), serde_json::to_value(record)?);
        }
        Ok(document)
    }
}

impl TemplateRegistry {
    /// Load the registry, seeding the system templates when nothing is stored yet.
    pub async fn open(store: JsonStore) -> Result<Self, StoreError> {
        let state = match store.read::<Value>().await {
            Ok(Some(Value::Object(document))) => RegistryState::from_document(document),
            Ok(Some(_)) => {
                warn!("Template registry is not a JSON object, using system templates read-only");
                RegistryState::seeded(true)
            }
            Ok(None) => {
                let state = RegistryState::seeded(false);
                store.write(&state.document(&state.templates)?).await?;
                info!("Seeded {} system templates", state.templates.len());
                state
            }
            Err(StoreError::Serialization(e)) => {
                warn!("Template registry unreadable, using system templates read-only: {}", e);
                RegistryState::seeded(true)
            }
            Err(e) => return Err(e),
        };

        info!(
            skipped = state.unparsed.len(),
            "Template registry loaded with {} templates",
            state.templates.len()
        );

        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// Registry seeded with the system templates, never persisted.
    pub fn memory() -> Self {
        Self {
            state: RwLock::new(RegistryState::seeded(false)),
            store: JsonStore::memory(),
        }
    }

    pub async fn get_all(&self) -> BTreeMap<String, TemplateRecord> {
        self.state.read().await.templates.clone()
    }

    /// Records of exactly this type. Unknown type names match nothing.
    pub async fn get_by_type(&self, kind: &str) -> Vec<TemplateRecord> {
        let Some(kind) = TemplateType::parse(kind) else {
            return Vec::new();
        };

        self.state
            .read()
            .await
            .templates
            .values()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<TemplateRecord, StoreError> {
        self.state
            .read()
            .await
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Template {} not found", id)))
    }

    /// Registered language for `id`, if the template exists.
    pub async fn language_of(&self, id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .templates
            .get(id)
            .map(|t| t.language.clone())
            .filter(|l| !l.is_empty())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.templates.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.templates.is_empty()
    }

    /// Merge `update` into an existing record and persist the whole registry.
    ///
    /// Nothing is written when `id` is unknown, the write fails, or the stored
    /// document could not be read at startup.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: &str,
        update: TemplateUpdate,
    ) -> Result<TemplateRecord, StoreError> {
        let mut state = self.state.write().await;

        let mut record = state
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Template {} not found", id)))?;

        if state.fallback {
            return Err(StoreError::Unavailable(
                "Template registry could not be read; fix the stored file before updating"
                    .to_string(),
            ));
        }

        record.apply(update, Utc::now());

        let mut next = state.templates.clone();
        next.insert(id.to_string(), record.clone());
        self.store.write(&state.document(&next)?).await?;
        state.templates = next;

        info!("Template updated");
        Ok(record)
    }

    /// Always refused, whatever the payload.
    pub async fn create(&self, _template: &Value) -> Result<TemplateRecord, StoreError> {
        Err(StoreError::Forbidden(
            "Template creation is disabled. Only system templates are allowed.".to_string(),
        ))
    }

    pub async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Forbidden(
            "Template deletion is disabled. System templates cannot be removed.".to_string(),
        ))
    }

    pub async fn reset_to_defaults(&self) -> Result<(), StoreError> {
        Err(StoreError::Forbidden(
            "Template reset is disabled. System templates are always at default state."
                .to_string(),
        ))
    }
}
