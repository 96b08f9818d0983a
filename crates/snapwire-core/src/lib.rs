//! Snapwire core types.
//!
//! This crate defines the row, result, and mode types shared by the
//! ingestion engine, the schema inferencer, and the CLI. Rows are arbitrary
//! JSON objects; nothing in the engine assumes a fixed shape beyond "string
//! keys, any values".

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod errors;
pub use errors::{SnapshotError, SnapshotResult};

/// One ingested row: an arbitrary JSON object (values may nest).
pub type Row = Value;

/// Progress callback invoked per accepted message batch.
///
/// Receives the *raw* extracted batch and the *current total* deduplicated
/// row count. Intended for progress reporting only — data accumulation is
/// the ingestor's job.
pub type OnBatch = Box<dyn Fn(&[Row], usize) + Send + Sync>;

// ============================================================================
// Ingestion Result
// ============================================================================

/// Outcome of one snapshot operation.
///
/// Every failure path of the engine converges on this shape so callers have
/// a single decision point; `fetch_snapshot` does not return `Err` for
/// expected failure modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    pub success: bool,

    /// Deduplicated rows, capped to the caller's `max_rows`.
    pub data: Vec<Row>,

    /// Human-readable failure description; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionResult {
    /// Successful snapshot carrying the collected rows.
    pub fn ok(data: Vec<Row>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Failed snapshot. Partial rows may still be attached by the caller
    /// when the partial-success rule applies.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

// ============================================================================
// Snapshot Mode
// ============================================================================

/// Current activity of a provider instance, as reported by its statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    Idle,
    Snapshot,
    Realtime,
}

impl SnapshotMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SnapshotMode::Idle => "idle",
            SnapshotMode::Snapshot => "snapshot",
            SnapshotMode::Realtime => "realtime",
        }
    }
}

impl Default for SnapshotMode {
    fn default() -> Self {
        SnapshotMode::Idle
    }
}

// ============================================================================
// Tests
// ============================================================================
