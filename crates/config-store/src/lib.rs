//! Configuration store for datasource documents.
//!
//! The ingestion engine's output — a field tree plus derived column
//! definitions — is persisted here by the caller, keyed by datasource id.
//! Documents are JSON values; `update` applies a merge patch so a caller
//! can adjust one key without clobbering the rest of the document.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

mod document;
mod errors;
mod file_store;
mod mem_store;

pub use document::FieldDocument;
pub use errors::{StoreError, StoreResult};
pub use file_store::FileConfigStore;
pub use mem_store::MemConfigStore;

/// Keyed JSON document storage.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch a document by id.
    async fn get_raw(&self, id: &str) -> StoreResult<Option<Value>>;

    /// Store (or replace) a document.
    async fn put_raw(&self, id: &str, doc: Value) -> StoreResult<()>;

    /// Merge a partial document into an existing one and return the result.
    ///
    /// Merge semantics follow JSON merge patch: object keys merge
    /// recursively, `null` removes a key, everything else replaces.
    /// Fails with [`StoreError::NotFound`] when no document exists.
    async fn update(&self, id: &str, partial: Value) -> StoreResult<Value> {
        let mut doc = self
            .get_raw(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        merge_patch(&mut doc, partial);
        self.put_raw(id, doc.clone()).await?;
        Ok(doc)
    }

    /// Remove a document; `true` when one existed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// All stored ids.
    async fn list(&self) -> StoreResult<Vec<String>>;
}

/// Typed access on top of any [`ConfigStore`].
#[async_trait]
pub trait ConfigStoreExt: ConfigStore {
    async fn get<T>(&self, id: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_raw(id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    async fn put<T>(&self, id: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.put_raw(id, serde_json::to_value(value)?).await
    }
}

impl<T: ConfigStore + ?Sized> ConfigStoreExt for T {}

/// JSON merge patch (RFC 7396 semantics).
fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = target {
                for (key, value) in entries {
                    if value.is_null() {
                        map.remove(&key);
                    } else {
                        merge_patch(
                            map.entry(key).or_insert(Value::Null),
                            value,
                        );
                    }
                }
            }
        }
        other => *target = other,
    }
}
