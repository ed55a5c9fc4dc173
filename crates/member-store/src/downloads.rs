//! Per-member download log with a trailing weekly quota.

use crate::error::StoreError;
use crate::json_file::JsonStore;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Length of the quota window in days.
pub const QUOTA_WINDOW_DAYS: i64 = 7;

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub allowed: bool,
    pub count_this_week: usize,
}

/// membership id → download timestamps (unix millis), append-only.
///
/// Only entries inside the trailing window count toward the quota; older
/// ones stay in the log. `check_allowed` and `record` are separate calls, so
/// two concurrent downloads for one member can both pass the check before
/// either is recorded. The quota is soft and that race is accepted.
pub struct DownloadTracker {
    log: RwLock<HashMap<String, Vec<i64>>>,
    store: JsonStore,
}

impl DownloadTracker {
    /// Load the log from `store`. A corrupt document starts an empty log.
    pub async fn open(store: JsonStore) -> Result<Self, StoreError> {
        let log = match store.read::<HashMap<String, Value>>().await {
            Ok(Some(raw)) => parse_log(raw),
            Ok(None) => HashMap::new(),
            Err(StoreError::Serialization(e)) => {
                warn!("Download log unreadable, starting empty: {}", e);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        info!("Download log loaded for {} members", log.len());

        Ok(Self {
            log: RwLock::new(log),
            store,
        })
    }

    /// Tracker that keeps the log in memory only.
    pub fn memory() -> Self {
        Self {
            log: RwLock::new(HashMap::new()),
            store: JsonStore::memory(),
        }
    }

    pub async fn check_allowed(&self, membership_id: &str, limit: u32) -> QuotaStatus {
        self.check_allowed_at(membership_id, limit, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn check_allowed_at(
        &self,
        membership_id: &str,
        limit: u32,
        now: DateTime<Utc>,
    ) -> QuotaStatus {
        let window_start = (now - Duration::days(QUOTA_WINDOW_DAYS)).timestamp_millis();

        let count_this_week = self
            .log
            .read()
            .await
            .get(membership_id)
            .map(|stamps| stamps.iter().filter(|&&ts| ts >= window_start).count())
            .unwrap_or(0);

        let status = QuotaStatus {
            allowed: count_this_week < limit as usize,
            count_this_week,
        };
        debug!(?status, "Download quota checked");
        status
    }

    /// Append a download and persist the whole log before returning.
    pub async fn record(&self, membership_id: &str) -> Result<(), StoreError> {
        self.record_at(membership_id, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn record_at(&self, membership_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut log = self.log.write().await;
        log.entry(membership_id.to_string())
            .or_default()
            .push(now.timestamp_millis());

        if let Err(e) = self.store.write(&*log).await {
            // Keep memory in step with what is on disk.
            if let Some(stamps) = log.get_mut(membership_id) {
                stamps.pop();
                if stamps.is_empty() {
                    log.remove(membership_id);
                }
            }
            return Err(e);
        }

        info!("Download recorded");
        Ok(())
    }

    /// Every recorded download for a member, oldest first.
    pub async fn history(&self, membership_id: &str) -> Vec<DateTime<Utc>> {
        self.log
            .read()
            .await
            .get(membership_id)
            .map(|stamps| {
                stamps
                    .iter()
                    .filter_map(|&ts| DateTime::<Utc>::from_timestamp_millis(ts))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Keep numeric timestamps, drop anything a hand edit may have left behind.
fn parse_log(raw: HashMap<String, Value>) -> HashMap<String, Vec<i64>> {
    raw.into_iter()
        .map(|(id, value)| {
            let stamps = value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                        .collect()
                })
                .unwrap_or_default();
            (id, stamps)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_download_allowed_then_blocked() {
        let tracker = DownloadTracker::memory();
        let now = Utc::now();

        let status = tracker.check_allowed_at("MSL-001", 1, now).await;
        assert_eq!(
            status,
            QuotaStatus {
                allowed: true,
                count_this_week: 0
            }
        );

        tracker.record_at("MSL-001", now).await.unwrap();

        let status = tracker.check_allowed_at("MSL-001", 1, now).await;
        assert_eq!(
            status,
            QuotaStatus {
                allowed: false,
                count_this_week: 1
            }
        );
    }

    #[tokio::test]
    async fn test_old_downloads_fall_out_of_window() {
        let tracker = DownloadTracker::memory();
        let now = Utc::now();

        tracker
            .record_at("MSL-002", now - Duration::days(8))
            .await
            .unwrap();

        let status = tracker.check_allowed_at("MSL-002", 1, now).await;
        assert!(status.allowed);
        assert_eq!(status.count_this_week, 0);
        // The log itself keeps the old entry.
        assert_eq!(tracker.history("MSL-002").await.len(), 1);
    }

    #[tokio::test]
    async fn test_window_boundary_is_inclusive() {
        let tracker = DownloadTracker::memory();
        let now = Utc::now();

        tracker
            .record_at("MSL-003", now - Duration::days(QUOTA_WINDOW_DAYS))
            .await
            .unwrap();

        let status = tracker.check_allowed_at("MSL-003", 2, now).await;
        assert_eq!(status.count_this_week, 1);
        assert!(status.allowed);
    }

    #[tokio::test]
    async fn test_members_are_independent() {
        let tracker = DownloadTracker::memory();
        let now = Utc::now();

        tracker.record_at("A", now).await.unwrap();
        assert!(!tracker.check_allowed_at("A", 1, now).await.allowed);
        assert!(tracker.check_allowed_at("B", 1, now).await.allowed);
    }

    #[tokio::test]
    async fn test_check_then_record_is_not_atomic() {
        // Two requests that both check before either records both pass.
        let tracker = DownloadTracker::memory();
        let now = Utc::now();

        let first = tracker.check_allowed_at("MSL-004", 1, now).await;
        let second = tracker.check_allowed_at("MSL-004", 1, now).await;
        assert!(first.allowed && second.allowed);

        tracker.record_at("MSL-004", now).await.unwrap();
        tracker.record_at("MSL-004", now).await.unwrap();

        let status = tracker.check_allowed_at("MSL-004", 1, now).await;
        assert_eq!(status.count_this_week, 2);
        assert!(!status.allowed);
    }

    #[tokio::test]
    async fn test_record_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");

        let tracker = DownloadTracker::open(JsonStore::file(&path)).await.unwrap();
        let now = Utc::now();
        tracker.record_at("MSL-005", now).await.unwrap();

        let raw: HashMap<String, Vec<i64>> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["MSL-005"], vec![now.timestamp_millis()]);

        let reopened = DownloadTracker::open(JsonStore::file(&path)).await.unwrap();
        assert!(!reopened.check_allowed_at("MSL-005", 1, now).await.allowed);
    }

    #[tokio::test]
    async fn test_open_ignores_non_numeric_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");
        let now = Utc::now().timestamp_millis();
        std::fs::write(
            &path,
            serde_json::json!({
                "MSL-006": [now, "yesterday", null],
                "MSL-007": "not a list"
            })
            .to_string(),
        )
        .unwrap();

        let tracker = DownloadTracker::open(JsonStore::file(&path)).await.unwrap();
        assert_eq!(tracker.history("MSL-006").await.len(), 1);
        assert!(tracker.history("MSL-007").await.is_empty());
    }

    #[tokio::test]
    async fn test_open_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");
        std::fs::write(&path, "[[[").unwrap();

        let tracker = DownloadTracker::open(JsonStore::file(&path)).await.unwrap();
        assert!(tracker.check_allowed("anyone", 1).await.allowed);
    }
}
