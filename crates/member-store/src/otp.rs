//! In-memory one-time password store.

use crate::error::OtpError;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// How long an issued code stays valid.
pub const DEFAULT_OTP_TTL: StdDuration = StdDuration::from_secs(5 * 60);

/// Longest accepted validity; larger configured values are clamped.
pub const MAX_OTP_TTL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// A pending code for one phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Phone → pending code. At most one live entry per phone.
///
/// Expired entries are not swept; they are dropped the next time someone
/// tries to verify against them. A wrong code leaves the entry in place, so
/// attempts are unlimited until expiry.
#[derive(Clone)]
pub struct OtpStore {
    entries: Arc<RwLock<HashMap<String, OtpEntry>>>,
    ttl: Duration,
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new(DEFAULT_OTP_TTL)
    }
}

impl OtpStore {
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_std(ttl.min(MAX_OTP_TTL)).unwrap_or_else(|_| Duration::minutes(5)),
        }
    }

    /// Validity window of an issued code.
    pub fn ttl(&self) -> StdDuration {
        self.ttl.to_std().unwrap_or(DEFAULT_OTP_TTL)
    }

    /// Issue a fresh code for `phone`, replacing any earlier one.
    pub async fn request(&self, phone: &str) -> String {
        self.request_at(phone, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn request_at(&self, phone: &str, now: DateTime<Utc>) -> String {
        let code = generate_code();
        let entry = OtpEntry {
            code: code.clone(),
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let replaced = self
            .entries
            .write()
            .await
            .insert(phone.to_string(), entry)
            .is_some();

        if replaced {
            debug!("Replaced pending OTP");
        }
        info!("OTP issued");

        code
    }

    /// Check `code` against the pending entry for `phone`. Single use.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<(), OtpError> {
        self.verify_at(phone, code, Utc::now()).await
    }

    #[instrument(skip(self, code, now))]
    pub async fn verify_at(
        &self,
        phone: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get(phone).ok_or(OtpError::NotFound)?;

        if now > entry.expires_at {
            entries.remove(phone);
            debug!("OTP expired, entry removed");
            return Err(OtpError::Expired);
        }

        if entry.code != code {
            debug!("OTP mismatch");
            return Err(OtpError::Mismatch);
        }

        entries.remove(phone);
        info!("OTP verified");
        Ok(())
    }

    /// Pending entry for `phone`, expired or not.
    pub async fn get(&self, phone: &str) -> Option<OtpEntry> {
        self.entries.read().await.get(phone).cloned()
    }

    /// Number of entries held, including stale ones.
    pub async fn pending_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Uniform six-digit code, zero-padded.
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const PHONE: &str = "03176227245";

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped() {
        let store = OtpStore::new(StdDuration::from_secs(10_000 * 365 * 24 * 60 * 60));
        assert_eq!(store.ttl(), MAX_OTP_TTL);

        let now = Utc::now();
        let code = store.request_at(PHONE, now).await;
        let entry = store.get(PHONE).await.unwrap();
        assert_eq!(entry.expires_at, now + Duration::hours(24));
        assert_ok!(store.verify_at(PHONE, &code, now + Duration::hours(23)).await);
    }

    #[tokio::test]
    async fn test_request_sets_expiry() {
        let store = OtpStore::default();
        let now = Utc::now();

        let code = store.request_at(PHONE, now).await;
        let entry = store.get(PHONE).await.unwrap();

        assert_eq!(entry.code, code);
        assert_eq!(entry.expires_at, now + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_verify_succeeds_once() {
        let store = OtpStore::default();
        let now = Utc::now();
        let code = store.request_at(PHONE, now).await;

        let later = now + Duration::minutes(4);
        assert_ok!(store.verify_at(PHONE, &code, later).await);
        assert_err!(store.verify_at(PHONE, &code, later).await);
    }

    #[tokio::test]
    async fn test_second_request_invalidates_first_code() {
        let store = OtpStore::default();
        let now = Utc::now();

        let first = store.request_at(PHONE, now).await;
        let mut second = store.request_at(PHONE, now).await;
        // Codes are random; force a distinct second code for the assertion.
        while second == first {
            second = store.request_at(PHONE, now).await;
        }

        assert_eq!(
            store.verify_at(PHONE, &first, now).await,
            Err(OtpError::Mismatch)
        );
        assert_eq!(store.verify_at(PHONE, &second, now).await, Ok(()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let store = OtpStore::default();
        let now = Utc::now();
        let code = store.request_at(PHONE, now).await;

        let late = now + Duration::minutes(5) + Duration::seconds(1);
        assert_eq!(
            store.verify_at(PHONE, &code, late).await,
            Err(OtpError::Expired)
        );
        assert_eq!(
            store.verify_at(PHONE, &code, late).await,
            Err(OtpError::NotFound)
        );
        assert_eq!(store.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_exact_expiry_instant_still_valid() {
        let store = OtpStore::default();
        let now = Utc::now();
        let code = store.request_at(PHONE, now).await;

        let boundary = now + Duration::minutes(5);
        assert_eq!(store.verify_at(PHONE, &code, boundary).await, Ok(()));
    }

    #[tokio::test]
    async fn test_mismatch_keeps_entry_for_retry() {
        let store = OtpStore::default();
        let now = Utc::now();
        let code = store.request_at(PHONE, now).await;
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 0..3 {
            assert_eq!(
                store.verify_at(PHONE, wrong, now).await,
                Err(OtpError::Mismatch)
            );
        }
        assert_eq!(store.verify_at(PHONE, &code, now).await, Ok(()));
    }

    #[tokio::test]
    async fn test_unknown_phone() {
        let store = OtpStore::default();
        assert_eq!(
            store.verify("03000000000", "123456").await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_phones_are_independent() {
        let store = OtpStore::new(StdDuration::from_secs(60));
        let a = store.request("03001111111").await;
        let b = store.request("03002222222").await;

        assert_eq!(store.pending_count().await, 2);
        assert_eq!(store.verify("03001111111", &a).await, Ok(()));
        assert_eq!(store.verify("03002222222", &b).await, Ok(()));
    }
}
