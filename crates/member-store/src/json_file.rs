//! Whole-document JSON persistence with a single writer per file.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

enum Backend {
    File(PathBuf),
    Memory(Mutex<Option<Value>>),
}

/// One JSON document, either on disk or held in memory.
///
/// Writes go through an in-process mutex and land via temp file + rename, so
/// concurrent writers in this process are serialized and readers never see a
/// half-written file.
pub struct JsonStore {
    backend: Backend,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Store backed by a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// Store that never touches disk.
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(None)),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file path, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path.as_path()),
            Backend::Memory(_) => None,
        }
    }

    /// Read the document. `None` when nothing has been written yet.
    pub async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        match &self.backend {
            Backend::File(path) => {
                let bytes = match fs::read(path).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Backend::Memory(slot) => match slot.lock().await.as_ref() {
                Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
                None => Ok(None),
            },
        }
    }

    /// Replace the whole document.
    pub async fn write<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        match &self.backend {
            Backend::File(path) => {
                let data = serde_json::to_vec_pretty(value)?;

                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent).await?;
                    }
                }

                let temp_path = path.with_extension("json.tmp");
                fs::write(&temp_path, &data).await?;
                fs::rename(&temp_path, path).await?;

                debug!("Saved {} bytes to {:?}", data.len(), path);
            }
            Backend::Memory(slot) => {
                *slot.lock().await = Some(serde_json::to_value(value)?);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::file(dir.path().join("absent.json"));

        let value: Option<HashMap<String, u32>> = store.read().await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let store = JsonStore::file(&path);

        let mut doc = HashMap::new();
        doc.insert("a".to_string(), 1u32);
        store.write(&doc).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let back: HashMap<String, u32> = store.read().await.unwrap().unwrap();
        assert_eq!(back.get("a"), Some(&1));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonStore::file(&path);
        let result: Result<Option<HashMap<String, u32>>, _> = store.read().await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let store = JsonStore::memory();
        assert!(store.path().is_none());

        let empty: Option<Vec<u8>> = store.read().await.unwrap();
        assert!(empty.is_none());

        store.write(&vec![1u8, 2, 3]).await.unwrap();
        let back: Vec<u8> = store.read().await.unwrap().unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
