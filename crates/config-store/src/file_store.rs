use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{ConfigStore, StoreResult};

/// Single-file JSON store: one map of id → document, rewritten atomically
/// via a temp file on every mutation. Fine at datasource-config scale.
pub struct FileConfigStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        })
    }

    async fn load(&self) -> StoreResult<HashMap<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        let map: HashMap<String, Value> = serde_json::from_slice(&bytes)?;
        Ok(map)
    }

    async fn save(&self, map: &HashMap<String, Value>) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get_raw(&self, id: &str) -> StoreResult<Option<Value>> {
        let _g = self.guard.lock().await;
        let mut map = self.load().await?;
        Ok(map.remove(id))
    }

    async fn put_raw(&self, id: &str, doc: Value) -> StoreResult<()> {
        let _g = self.guard.lock().await;
        let mut map = self.load().await?;
        map.insert(id.to_string(), doc);
        self.save(&map).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let _g = self.guard.lock().await;
        let mut map = self.load().await?;
        let existed = map.remove(id).is_some();
        if existed {
            self.save(&map).await?;
        }
        Ok(existed)
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let _g = self.guard.lock().await;
        let map = self.load().await?;
        Ok(map.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigStore;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("snapwire-store-{name}.json"))
    }

    #[tokio::test]
    async fn round_trips_documents_through_disk() {
        let path = temp_path("roundtrip");
        let _ = tokio::fs::remove_file(&path).await;

        let store = FileConfigStore::new(&path).unwrap();
        store
            .put_raw("prices", json!({"rows": 10}))
            .await
            .unwrap();

        // A fresh store instance sees the persisted document.
        let reopened = FileConfigStore::new(&path).unwrap();
        let doc = reopened.get_raw("prices").await.unwrap().unwrap();
        assert_eq!(doc, json!({"rows": 10}));

        assert!(reopened.delete("prices").await.unwrap());
        assert!(reopened.get_raw("prices").await.unwrap().is_none());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let path = temp_path("missing");
        let _ = tokio::fs::remove_file(&path).await;

        let store = FileConfigStore::new(&path).unwrap();
        assert!(store.get_raw("anything").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }
}
