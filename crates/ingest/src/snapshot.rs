//! The snapshot acquisition state machine.
//!
//! One call to [`SnapshotIngestor::fetch_snapshot`] drives the whole
//! protocol: connect → subscribe → trigger → accumulate → terminal. All
//! five event sources (connect, message, broker error, transport error,
//! disconnect) arrive on the session's single event channel, raced in one
//! `tokio::select!` against the snapshot deadline and the caller's
//! cancellation token, so exactly one terminal fires per call and double
//! resolution is structurally impossible.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use snapwire_config::ConnectionConfig;
use snapwire_core::{
    IngestionResult, OnBatch, Row, SnapshotError, SnapshotMode,
};
use stomp::{
    BusSession, BusTransport, ConnectOptions, SessionEvent, WsTransport,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::dedup::DedupState;
use crate::stats::StatisticsTracker;

/// Drives one bounded snapshot pull per call.
///
/// Instance-owned state only: independent ingestors may run concurrent
/// snapshots against different endpoints. A single instance must not have
/// `fetch_snapshot` invoked twice concurrently — each call owns one
/// transport session exclusively.
pub struct SnapshotIngestor<T = WsTransport> {
    transport: T,
    stats: Arc<StatisticsTracker>,
}

/// Why the receive loop ended.
enum Terminal {
    Completed { capped: bool },
    TimedOut,
    Errored(String),
    Disconnected,
    Cancelled,
}

impl SnapshotIngestor<WsTransport> {
    pub fn new(stats: Arc<StatisticsTracker>) -> Self {
        Self::with_transport(WsTransport, stats)
    }
}

impl<T: BusTransport> SnapshotIngestor<T> {
    pub fn with_transport(transport: T, stats: Arc<StatisticsTracker>) -> Self {
        Self { transport, stats }
    }

    pub fn stats(&self) -> &Arc<StatisticsTracker> {
        &self.stats
    }

    /// Fetch a snapshot with a fresh, never-cancelled token.
    pub async fn fetch_snapshot(
        &self,
        cfg: &ConnectionConfig,
        max_rows: usize,
        on_batch: Option<OnBatch>,
    ) -> IngestionResult {
        self.fetch_snapshot_with_cancel(
            cfg,
            max_rows,
            on_batch,
            CancellationToken::new(),
        )
        .await
    }

    /// Fetch a snapshot, abortable through `cancel`.
    ///
    /// Never returns `Err` for expected failure modes: every terminal
    /// converges on an [`IngestionResult`]. Cancellation and unexpected
    /// disconnects follow the same partial-success rule as timeout.
    #[instrument(skip_all, fields(topic = %cfg.listener_topic))]
    pub async fn fetch_snapshot_with_cancel(
        &self,
        cfg: &ConnectionConfig,
        max_rows: usize,
        on_batch: Option<OnBatch>,
        cancel: CancellationToken,
    ) -> IngestionResult {
        if let Err(e) = cfg.validate() {
            return IngestionResult::failed(e.to_string());
        }

        self.stats.set_mode(SnapshotMode::Snapshot);
        let result = self.run(cfg, max_rows, on_batch, cancel).await;
        self.stats.set_mode(SnapshotMode::Idle);

        match &result {
            Ok(r) | Err(r) => debug!(
                success = r.success,
                rows = r.row_count(),
                "snapshot resolved"
            ),
        }
        match result {
            Ok(r) | Err(r) => r,
        }
    }

    async fn run(
        &self,
        cfg: &ConnectionConfig,
        max_rows: usize,
        on_batch: Option<OnBatch>,
        cancel: CancellationToken,
    ) -> Result<IngestionResult, IngestionResult> {
        let opts = ConnectOptions::default();
        let mut session = self
            .transport
            .connect(&cfg.websocket_url, &opts)
            .await
            .map_err(|e| {
                self.stats.record_disconnection();
                IngestionResult::failed(e.to_string())
            })?;
        self.stats.record_connection();
        counter!("snapwire_connections_total").increment(1);

        if let Err(e) = session.subscribe(&cfg.listener_topic).await {
            self.teardown(session).await;
            return Err(IngestionResult::failed(e.to_string()));
        }

        if let Some(trigger) = &cfg.request_message {
            info!(trigger = %trigger, "publishing snapshot trigger");
            if let Err(e) = session.publish(trigger, &cfg.request_body).await {
                self.teardown(session).await;
                return Err(IngestionResult::failed(e.to_string()));
            }
        }

        let deadline = tokio::time::sleep(cfg.snapshot_timeout());
        tokio::pin!(deadline);

        let mut state = DedupState::new();

        let terminal = loop {
            tokio::select! {
                () = &mut deadline => break Terminal::TimedOut,

                () = cancel.cancelled() => break Terminal::Cancelled,

                event = session.recv() => match event {
                    None | Some(SessionEvent::Disconnected) => {
                        break Terminal::Disconnected;
                    }
                    Some(SessionEvent::TransportError(e)) => {
                        break Terminal::Errored(e);
                    }
                    Some(SessionEvent::ProtocolError(e)) => {
                        break Terminal::Errored(e);
                    }
                    Some(SessionEvent::Message { body, .. }) => {
                        let payload: Value =
                            match serde_json::from_slice(&body) {
                                Ok(v) => v,
                                Err(e) => {
                                    warn!(error = %e, "dropping unparseable message body");
                                    continue;
                                }
                            };

                        if is_completion(&payload, &cfg.snapshot_end_token) {
                            break Terminal::Completed { capped: false };
                        }

                        let batch = extract_rows(&payload);
                        if batch.is_empty() {
                            continue;
                        }

                        self.stats
                            .record_snapshot_batch(batch.len(), body.len());
                        counter!(
                            "snapwire_snapshot_rows_total",
                            "topic" => cfg.listener_topic.clone()
                        )
                        .increment(batch.len() as u64);

                        state.apply(&batch, cfg.key_column.as_deref());

                        if let Some(cb) = &on_batch {
                            cb(&batch, state.len());
                        }

                        if state.len() >= max_rows {
                            break Terminal::Completed { capped: true };
                        }
                    }
                },
            }
        };

        self.teardown(session).await;

        let mut rows = state.into_rows();
        Ok(match terminal {
            Terminal::Completed { capped } => {
                if capped {
                    rows.truncate(max_rows);
                }
                info!(rows = rows.len(), capped, "snapshot completed");
                IngestionResult::ok(rows)
            }
            Terminal::TimedOut => partial_or_failed(
                rows,
                SnapshotError::Timeout.to_string(),
                "snapshot timed out",
            ),
            Terminal::Cancelled => partial_or_failed(
                rows,
                SnapshotError::Cancelled.to_string(),
                "snapshot cancelled",
            ),
            Terminal::Disconnected => partial_or_failed(
                rows,
                "Connection closed before snapshot completed".to_string(),
                "connection closed mid-snapshot",
            ),
            Terminal::Errored(e) => {
                warn!(error = %e, "snapshot errored");
                IngestionResult::failed(e)
            }
        })
    }

    async fn teardown(&self, mut session: Box<dyn BusSession>) {
        session.disconnect().await;
        self.stats.record_disconnection();
    }
}

/// Timeout, cancellation, and unexpected disconnect all resolve success
/// when at least one row was collected.
fn partial_or_failed(
    rows: Vec<Row>,
    error: String,
    context: &str,
) -> IngestionResult {
    if rows.is_empty() {
        warn!(error = %error, "{context} with no data");
        IngestionResult::failed(error)
    } else {
        info!(rows = rows.len(), "{context}; keeping partial snapshot");
        IngestionResult::ok(rows)
    }
}

/// A payload signals completion through `snapshotToken` or `status`.
fn is_completion(payload: &Value, end_token: &str) -> bool {
    ["snapshotToken", "status"].iter().any(|field| {
        payload
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|token| token == end_token)
    })
}

/// Normalize the accepted payload shapes to a row batch: `.rows`, `.data`,
/// a bare array, or a single bare object.
fn extract_rows(payload: &Value) -> Vec<Row> {
    if let Some(rows) = payload.get("rows").and_then(Value::as_array) {
        return rows.clone();
    }
    if let Some(rows) = payload.get("data").and_then(Value::as_array) {
        return rows.clone();
    }
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![payload.clone()],
        _ => Vec::new(),
    }
}
