//! Notification settings and their default resolution.

use crate::error::StoreError;
use crate::json_file::JsonStore;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Resolved settings. Every reader goes through [`NotificationSettings::from_stored`]
/// so the defaults live in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationSettings {
    pub whatsapp_enabled: bool,
    pub downloads_per_week: u32,
    pub registration_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            whatsapp_enabled: true,
            downloads_per_week: 1,
            registration_enabled: true,
        }
    }
}

impl NotificationSettings {
    /// Resolve a stored document. Missing fields take their defaults.
    pub fn from_stored(raw: &Value) -> Self {
        Self {
            whatsapp_enabled: raw
                .get("whatsapp_enabled")
                .map(truthy)
                .unwrap_or(true),
            downloads_per_week: resolve_downloads(raw.get("downloads_per_week")),
            registration_enabled: resolve_registration(raw.get("registration_enabled")),
        }
    }

    /// Resolve an administrative write. An omitted `whatsapp_enabled` turns
    /// notifications off.
    pub fn from_update(raw: &Value) -> Self {
        Self {
            whatsapp_enabled: raw.get("whatsapp_enabled").map(truthy).unwrap_or(false),
            downloads_per_week: resolve_downloads(raw.get("downloads_per_week")),
            registration_enabled: resolve_registration(raw.get("registration_enabled")),
        }
    }
}

/// Positive number or numeric string, else 1.
fn resolve_downloads(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };

    match n {
        Some(n) if n.is_finite() && n >= 1.0 => n.min(u32::MAX as f64) as u32,
        _ => 1,
    }
}

/// Integer prefix of a string, ignoring leading whitespace ("3 per week" → 3).
fn leading_integer(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<f64>().ok()
}

fn resolve_registration(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        _ => true,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Settings document, read fresh on every check.
pub struct SettingsStore {
    store: JsonStore,
}

impl SettingsStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn memory() -> Self {
        Self::new(JsonStore::memory())
    }

    /// Current settings. Unreadable storage falls back to defaults.
    pub async fn load(&self) -> NotificationSettings {
        match self.store.read::<Value>().await {
            Ok(Some(raw)) => NotificationSettings::from_stored(&raw),
            Ok(None) => NotificationSettings::default(),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                NotificationSettings::default()
            }
        }
    }

    /// Resolve and persist an administrative write, replacing the whole document.
    pub async fn save(&self, raw: &Value) -> Result<NotificationSettings, StoreError> {
        let settings = NotificationSettings::from_update(raw);
        self.store.write(&settings).await?;
        info!(?settings, "Settings saved");
        Ok(settings)
    }
}
