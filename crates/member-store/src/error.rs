//! Store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation permanently disabled by policy.
    #[error("{0}")]
    Forbidden(String),

    /// Store is running without its persisted state and refuses writes.
    #[error("{0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why an OTP verification was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    #[error("No OTP requested")]
    NotFound,

    #[error("OTP expired")]
    Expired,

    #[error("Invalid code")]
    Mismatch,
}
