use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{ConfigStore, StoreResult};

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemConfigStore {
    map: RwLock<HashMap<String, Value>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemConfigStore {
    async fn get_raw(&self, id: &str) -> StoreResult<Option<Value>> {
        let map = self.map.read().await;
        Ok(map.get(id).cloned())
    }

    async fn put_raw(&self, id: &str, doc: Value) -> StoreResult<()> {
        let mut map = self.map.write().await;
        map.insert(id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut map = self.map.write().await;
        Ok(map.remove(id).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.map.read().await.keys().cloned().collect())
    }
}
