//! Membership card layout document.

use crate::error::StoreError;
use crate::json_file::JsonStore;
use serde_json::{json, Value};

/// Layout returned before any has been saved.
pub fn default_layout() -> Value {
    json!({ "basePdf": "", "schemas": [[]] })
}

/// Opaque layout document edited by the card designer.
pub struct CardTemplateStore {
    store: JsonStore,
}

impl CardTemplateStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn memory() -> Self {
        Self::new(JsonStore::memory())
    }

    pub async fn load(&self) -> Result<Value, StoreError> {
        Ok(self.store.read::<Value>().await?.unwrap_or_else(default_layout))
    }

    pub async fn save(&self, layout: &Value) -> Result<(), StoreError> {
        self.store.write(layout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_until_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = CardTemplateStore::new(JsonStore::file(dir.path().join("template/template.json")));

        assert_eq!(store.load().await.unwrap(), default_layout());

        let layout = json!({"basePdf": "data:application/pdf;base64,AAAA", "schemas": [[{"name": "full_name"}]]});
        store.save(&layout).await.unwrap();
        assert_eq!(store.load().await.unwrap(), layout);
    }
}
