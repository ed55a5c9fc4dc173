//! Membership notification backend.
//!
//! Serves the admin and member frontends:
//! - Issues and verifies WhatsApp one-time passwords
//! - Sends approval and registration notifications by WhatsApp template and email
//! - Enforces a weekly card download quota per member
//! - Exposes the template registry, notification settings and card layout

pub mod api;
pub mod config;
pub mod error;
pub mod mailer;
pub mod notify;
pub mod status_log;

pub use config::Config;
pub use error::ApiError;
pub use mailer::{DisabledMailer, HttpMailer, Mailer};
pub use notify::Notifier;
pub use status_log::StatusLog;
