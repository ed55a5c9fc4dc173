//! WhatsApp client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token or sender id missing. Callers treat this as a soft failure.
    #[error("WhatsApp not configured")]
    NotConfigured,

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
}
