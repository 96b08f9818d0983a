//! Structural schema inference from JSON row samples.
//!
//! Feeds a finite batch of rows (as returned by a snapshot) through a
//! recursive merge and produces a field tree keyed by dot-joined path,
//! carrying type, nullability, and a sample value per field.
//!
//! # Example
//!
//! ```
//! use schema_infer::{infer, FieldType};
//! use serde_json::json;
//!
//! let rows = vec![json!({"user": {"name": "Bob", "age": 30}})];
//! let tree = infer(&rows);
//!
//! let user = &tree["user"];
//! assert_eq!(user.field_type, FieldType::Object);
//! let children = user.children.as_ref().unwrap();
//! assert_eq!(children["age"].field_type, FieldType::Number);
//! assert_eq!(children["age"].path, "user.age");
//! ```

mod classify;
mod columns;
mod merge;

pub use classify::{classify, FieldType};
pub use columns::{derive_columns, ColumnDef};
pub use merge::{infer, FieldInfo, FieldTree};
