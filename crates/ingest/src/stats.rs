//! Passive ingestion counters.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use snapwire_core::SnapshotMode;

/// Counters owned by one provider instance, updated by the ingestion path.
///
/// Reset only by re-construction. The update (realtime) counters exist for
/// the delta-subscription phase, which the snapshot engine references but
/// does not exercise.
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    connection_count: AtomicU64,
    disconnection_count: AtomicU64,
    snapshot_rows_received: AtomicU64,
    snapshot_bytes_received: AtomicU64,
    update_rows_received: AtomicU64,
    update_bytes_received: AtomicU64,
    mode: AtomicU8,
}

/// Serializable point-in-time view of a [`StatisticsTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub connection_count: u64,
    pub disconnection_count: u64,
    pub snapshot_rows_received: u64,
    pub snapshot_bytes_received: u64,
    pub update_rows_received: u64,
    pub update_bytes_received: u64,
    pub mode: SnapshotMode,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self) {
        self.connection_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnection(&self) {
        self.disconnection_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_batch(&self, rows: usize, bytes: usize) {
        self.snapshot_rows_received
            .fetch_add(rows as u64, Ordering::Relaxed);
        self.snapshot_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_update_batch(&self, rows: usize, bytes: usize) {
        self.update_rows_received
            .fetch_add(rows as u64, Ordering::Relaxed);
        self.update_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn set_mode(&self, mode: SnapshotMode) {
        self.mode.store(mode_tag(mode), Ordering::Relaxed);
    }

    pub fn mode(&self) -> SnapshotMode {
        match self.mode.load(Ordering::Relaxed) {
            1 => SnapshotMode::Snapshot,
            2 => SnapshotMode::Realtime,
            _ => SnapshotMode::Idle,
        }
    }

    pub fn snapshot(&self) -> Statistics {
        Statistics {
            connection_count: self.connection_count.load(Ordering::Relaxed),
            disconnection_count: self
                .disconnection_count
                .load(Ordering::Relaxed),
            snapshot_rows_received: self
                .snapshot_rows_received
                .load(Ordering::Relaxed),
            snapshot_bytes_received: self
                .snapshot_bytes_received
                .load(Ordering::Relaxed),
            update_rows_received: self
                .update_rows_received
                .load(Ordering::Relaxed),
            update_bytes_received: self
                .update_bytes_received
                .load(Ordering::Relaxed),
            mode: self.mode(),
        }
    }
}

fn mode_tag(mode: SnapshotMode) -> u8 {
    match mode {
        SnapshotMode::Idle => 0,
        SnapshotMode::Snapshot => 1,
        SnapshotMode::Realtime => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = StatisticsTracker::new();
        stats.record_connection();
        stats.record_connection();
        stats.record_disconnection();
        stats.record_snapshot_batch(10, 2048);
        stats.record_snapshot_batch(5, 512);

        let view = stats.snapshot();
        assert_eq!(view.connection_count, 2);
        assert_eq!(view.disconnection_count, 1);
        assert_eq!(view.snapshot_rows_received, 15);
        assert_eq!(view.snapshot_bytes_received, 2560);
        assert_eq!(view.update_rows_received, 0);
    }

    #[test]
    fn mode_round_trips() {
        let stats = StatisticsTracker::new();
        assert_eq!(stats.mode(), SnapshotMode::Idle);

        stats.set_mode(SnapshotMode::Snapshot);
        assert_eq!(stats.mode(), SnapshotMode::Snapshot);
        assert_eq!(stats.snapshot().mode, SnapshotMode::Snapshot);

        stats.set_mode(SnapshotMode::Realtime);
        stats.record_update_batch(3, 99);
        assert_eq!(stats.mode(), SnapshotMode::Realtime);
        assert_eq!(stats.snapshot().update_rows_received, 3);

        stats.set_mode(SnapshotMode::Idle);
        assert_eq!(stats.mode(), SnapshotMode::Idle);
    }
}
