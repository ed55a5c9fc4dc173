//! Configuration for the membership server.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// WhatsApp Cloud API
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// JSON document storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound notification content
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Transactional email relay
    #[serde(default)]
    pub mail: MailConfig,

    /// Rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API base URL
    #[serde(default = "default_whatsapp_api_url")]
    pub api_url: String,

    /// Graph API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Access token. Without it every send reports "not configured".
    #[serde(default)]
    pub token: Option<String>,

    /// Sender phone number id
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Business account id, used to list provider templates
    #[serde(default)]
    pub business_account_id: Option<String>,

    /// Country calling code for national-format numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Token echoed back during webhook subscription
    #[serde(default)]
    pub webhook_verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` checks. Unset disables the check.
    #[serde(default)]
    pub app_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON documents
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Enable persistence (if false, every store is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_otp_template")]
    pub otp_template: String,

    #[serde(default = "default_approval_template")]
    pub approval_template: String,

    #[serde(default = "default_registration_template")]
    pub registration_template: String,

    /// Product name shown in the OTP message
    #[serde(default = "default_card_label")]
    pub card_label: String,

    /// Help line shown in the OTP message
    #[serde(default = "default_support_contact")]
    pub support_contact: String,

    /// Link carried by the registration template's URL button
    #[serde(default = "default_registration_button_url")]
    pub registration_button_url: String,

    /// How long an OTP stays valid
    #[serde(default = "default_otp_ttl", with = "humantime_serde")]
    pub otp_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Relay endpoint. Unset disables email.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub from: String,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// File receiving startup, bind and panic lines
    #[serde(default = "default_status_path")]
    pub status_path: PathBuf,
}

impl StorageConfig {
    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("whatsapp_settings.json")
    }

    pub fn downloads_path(&self) -> PathBuf {
        self.dir.join("downloads.json")
    }

    pub fn templates_path(&self) -> PathBuf {
        self.dir.join("whatsapp_templates.json")
    }

    pub fn card_template_path(&self) -> PathBuf {
        self.dir.join("template").join("template.json")
    }
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: default_whatsapp_api_url(),
            api_version: default_api_version(),
            token: None,
            phone_number_id: None,
            business_account_id: None,
            country_code: default_country_code(),
            timeout: default_timeout(),
            webhook_verify_token: None,
            app_secret: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            persist: true,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            otp_template: default_otp_template(),
            approval_template: default_approval_template(),
            registration_template: default_registration_template(),
            card_label: default_card_label(),
            support_contact: default_support_contact(),
            registration_button_url: default_registration_button_url(),
            otp_ttl: default_otp_ttl(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            from: default_mail_from(),
            timeout: default_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            status_path: default_status_path(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3001
}

fn default_whatsapp_api_url() -> String {
    whatsapp_client::DEFAULT_API_URL.into()
}

fn default_api_version() -> String {
    whatsapp_client::DEFAULT_API_VERSION.into()
}

fn default_country_code() -> String {
    whatsapp_client::DEFAULT_COUNTRY_CODE.into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_true() -> bool {
    true
}

fn default_otp_template() -> String {
    member_store::OTP_TEMPLATE_ID.into()
}

fn default_approval_template() -> String {
    member_store::APPROVAL_TEMPLATE_ID.into()
}

fn default_registration_template() -> String {
    member_store::REGISTRATION_TEMPLATE_ID.into()
}

fn default_card_label() -> String {
    "MSL Card".into()
}

fn default_support_contact() -> String {
    "03176227245".into()
}

fn default_registration_button_url() -> String {
    "https://www.facebook.com/mslpakistan".into()
}

fn default_otp_ttl() -> Duration {
    member_store::DEFAULT_OTP_TTL
}

fn default_mail_from() -> String {
    "no-reply@localhost".into()
}

fn default_global_rpm() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".into()
}

fn default_status_path() -> PathBuf {
    PathBuf::from("logs/server-status.log")
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.whatsapp.api_version, "v17.0");
        assert_eq!(config.whatsapp.country_code, "92");
        assert_eq!(config.whatsapp.timeout, Duration::from_secs(15));
        assert!(config.whatsapp.token.is_none());
        assert_eq!(config.notifications.registration_template, "memeber_register");
        assert_eq!(config.notifications.otp_ttl, Duration::from_secs(300));
        assert_eq!(config.rate_limit.global_per_minute, 600);
        assert!(config.storage.persist);
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            dir: PathBuf::from("/srv/msl"),
            persist: true,
        };

        assert_eq!(
            storage.downloads_path(),
            PathBuf::from("/srv/msl/downloads.json")
        );
        assert_eq!(
            storage.card_template_path(),
            PathBuf::from("/srv/msl/template/template.json")
        );
    }

    #[test]
    fn test_deserialize_humantime_fields() {
        let raw = serde_json::json!({
            "notifications": { "otp_ttl": "10m" },
            "whatsapp": { "timeout": "3s", "token": "abc" }
        });
        let config: Config = serde_json::from_value(raw).unwrap();

        assert_eq!(config.notifications.otp_ttl, Duration::from_secs(600));
        assert_eq!(config.whatsapp.timeout, Duration::from_secs(3));
        assert_eq!(config.whatsapp.token.as_deref(), Some("abc"));
        assert_eq!(config.notifications.card_label, "MSL Card");
    }
}
