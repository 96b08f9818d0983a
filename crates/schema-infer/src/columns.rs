//! Flat column definitions derived from a field tree.
//!
//! The configuration store persists a column list alongside the tree; the
//! list is what grids and editors bind to, one entry per leaf path.

use serde::{Deserialize, Serialize};

use crate::classify::FieldType;
use crate::merge::{FieldInfo, FieldTree};

/// One derived column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Full dot path into the row, usable as a grid field accessor.
    pub field: String,

    /// Display name: the unqualified last path segment.
    pub header: String,

    #[serde(rename = "type")]
    pub kind: FieldType,

    pub nullable: bool,
}

/// Flatten the tree into column definitions, one per non-object node,
/// sorted by path for a stable order.
pub fn derive_columns(tree: &FieldTree) -> Vec<ColumnDef> {
    let mut columns = Vec::new();
    for info in tree.values() {
        collect(info, &mut columns);
    }
    columns.sort_by(|a, b| a.field.cmp(&b.field));
    columns
}

fn collect(info: &FieldInfo, out: &mut Vec<ColumnDef>) {
    match &info.children {
        Some(children) => {
            for child in children.values() {
                collect(child, out);
            }
        }
        None => out.push(ColumnDef {
            field: info.path.clone(),
            header: info
                .path
                .rsplit('.')
                .next()
                .unwrap_or(info.path.as_str())
                .to_string(),
            kind: info.field_type,
            nullable: info.nullable,
        }),
    }
}
