//! The persisted shape of an inference run.

use chrono::{DateTime, Utc};
use schema_infer::{derive_columns, ColumnDef, FieldTree};
use serde::{Deserialize, Serialize};

/// Field tree plus derived columns for one datasource, as written to the
/// store after a snapshot + inference pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDocument {
    /// Datasource payload label, carried through from the connection config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Inferred schema keyed by top-level field name.
    pub fields: FieldTree,

    /// Flat column list derived from the tree.
    pub columns: Vec<ColumnDef>,

    /// Number of sample rows the inference ran over.
    pub sampled_rows: usize,

    pub updated_at: DateTime<Utc>,
}

impl FieldDocument {
    /// Build the document from an inference result.
    pub fn from_inference(
        data_type: Option<String>,
        fields: FieldTree,
        sampled_rows: usize,
    ) -> Self {
        let columns = derive_columns(&fields);
        Self {
            data_type,
            fields,
            columns,
            sampled_rows,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_infer::infer;
    use serde_json::json;

    #[test]
    fn document_carries_tree_and_columns() {
        let tree = infer(&[json!({"id": 1, "user": {"name": "Bob"}})]);
        let doc =
            FieldDocument::from_inference(Some("fx".into()), tree, 1);

        assert_eq!(doc.sampled_rows, 1);
        assert_eq!(doc.data_type.as_deref(), Some("fx"));
        assert_eq!(doc.columns.len(), 2);
        assert!(doc.fields.contains_key("user"));
    }

    #[test]
    fn document_round_trips_through_json() {
        let tree = infer(&[json!({"a": "2024-01-01T00:00:00Z"})]);
        let doc = FieldDocument::from_inference(None, tree, 1);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fields"]["a"]["type"], "date");
        assert!(json.get("data_type").is_none());

        let parsed: FieldDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.sampled_rows, 1);
    }
}
