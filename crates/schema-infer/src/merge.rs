//! Field tree construction by recursive merge across heterogeneous rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snapwire_core::Row;
use tracing::trace;

use crate::classify::{classify, FieldType};

/// Inferred field tree, keyed by top-level field name.
pub type FieldTree = HashMap<String, FieldInfo>;

/// One node of the inferred schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Dot-joined path from the root, e.g. `user.address.city`.
    pub path: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// OR-accumulated across every row observed at this path; never
    /// reverts to false once set.
    pub nullable: bool,

    /// Most recently observed non-null value (the first observation when
    /// everything seen so far was null).
    pub sample: Value,

    /// Present iff `field_type == Object`; keyed by the unqualified child
    /// name, each child carrying its own full dot path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<HashMap<String, FieldInfo>>,
}

/// Infer a field tree from a finite row batch.
///
/// Rows are processed independently and merged; the result does not depend
/// on row order except for which concrete value ends up in `sample`.
/// Non-object rows carry no named fields and are skipped.
pub fn infer(rows: &[Row]) -> FieldTree {
    let mut fields = FieldTree::new();
    for row in rows {
        match row {
            Value::Object(map) => {
                for (key, value) in map {
                    merge_value(&mut fields, key, key, value);
                }
            }
            other => {
                trace!(kind = %json_kind(other), "skipping non-object row");
            }
        }
    }
    fields
}

fn merge_value(
    fields: &mut HashMap<String, FieldInfo>,
    name: &str,
    path: &str,
    value: &Value,
) {
    let observed = classify(value);
    let is_null = value.is_null();

    let info = fields.entry(name.to_string()).or_insert_with(|| FieldInfo {
        path: path.to_string(),
        field_type: observed,
        nullable: is_null,
        sample: value.clone(),
        children: None,
    });

    info.nullable |= is_null;

    if !is_null {
        if info.field_type != observed {
            if info.sample.is_null() {
                // Every observation so far was null, so the node carries the
                // provisional string tag; the first concrete value sets the
                // real type instead of widening.
                info.field_type = observed;
            } else {
                // Conflicting types across rows widen to string. Dropping
                // any accumulated children keeps the children-iff-object
                // invariant.
                info.field_type = FieldType::String;
                info.children = None;
            }
        }
        info.sample = value.clone();
    }

    if info.field_type == FieldType::Object {
        if let Value::Object(map) = value {
            let children = info.children.get_or_insert_with(HashMap::new);
            for (key, child) in map {
                let child_path = make_path(path, key);
                merge_value(children, key, &child_path, child);
            }
        }
    }
}

fn make_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
