//! Snapshot ingestion engine.
//!
//! Connects to a STOMP endpoint, requests a bounded snapshot of rows,
//! deduplicates them by a configurable key column, and detects
//! end-of-snapshot via a sentinel token, a row cap, or timeout. The row set
//! it produces is what the schema inferencer consumes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ingest::{ConnectionTester, SnapshotIngestor, StatisticsTracker};
//!
//! let stats = Arc::new(StatisticsTracker::new());
//! let tester = ConnectionTester::new(stats.clone());
//! if tester.test_connection(&cfg).await {
//!     let ingestor = SnapshotIngestor::new(stats.clone());
//!     let result = ingestor.fetch_snapshot(&cfg, 500, None).await;
//!     println!("{} rows", result.row_count());
//! }
//! ```

mod dedup;
mod snapshot;
mod stats;
mod tester;

pub use dedup::DedupState;
pub use snapshot::SnapshotIngestor;
pub use stats::{Statistics, StatisticsTracker};
pub use tester::ConnectionTester;
