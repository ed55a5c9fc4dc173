//! State behind the membership service.
//!
//! The OTP store lives in memory only. Download history, template metadata,
//! notification settings and the card layout are single JSON documents on
//! disk, each written through a [`JsonStore`] so that concurrent writers in
//! this process are serialized.

mod card_template;
mod downloads;
mod error;
mod json_file;
mod otp;
mod settings;
mod templates;

pub use card_template::{default_layout, CardTemplateStore};
pub use downloads::{DownloadTracker, QuotaStatus, QUOTA_WINDOW_DAYS};
pub use error::{OtpError, StoreError};
pub use json_file::JsonStore;
pub use otp::{OtpEntry, OtpStore, DEFAULT_OTP_TTL, MAX_OTP_TTL};
pub use settings::{NotificationSettings, SettingsStore};
pub use templates::{
    default_templates, TemplateRecord, TemplateRegistry, TemplateType, TemplateUpdate,
    APPROVAL_TEMPLATE_ID, OTP_TEMPLATE_ID, REGISTRATION_TEMPLATE_ID,
};
