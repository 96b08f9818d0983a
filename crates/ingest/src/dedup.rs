//! Last-write-wins row deduplication for one ingestion batch.

use std::collections::HashMap;

use serde_json::Value;
use snapwire_core::Row;

/// Keyed "latest row wins" accumulator, owned by one in-flight snapshot.
///
/// Rows live in a single arrival-ordered vector; keyed rows additionally
/// carry a key→slot index so a later emission with the same key replaces
/// in place, keeping the position of the first occurrence. Rows without a
/// usable key (no key column configured, or a null/absent key value)
/// append in arrival order.
#[derive(Debug, Default)]
pub struct DedupState {
    rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch into the state.
    ///
    /// Idempotent for keyed rows: re-applying an already-applied batch
    /// rewrites the same slots with the same values.
    pub fn apply(&mut self, batch: &[Row], key_column: Option<&str>) {
        for row in batch {
            match key_column.and_then(|col| dedup_key(row, col)) {
                Some(key) => match self.index.get(&key) {
                    Some(&slot) => self.rows[slot] = row.clone(),
                    None => {
                        self.index.insert(key, self.rows.len());
                        self.rows.push(row.clone());
                    }
                },
                None => self.rows.push(row.clone()),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Materialize the final row set, consuming the state.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Stringified key for a row, or `None` when the key is absent or null.
fn dedup_key(row: &Row, key_column: &str) -> Option<String> {
    match row.get(key_column) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}
