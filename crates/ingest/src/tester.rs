//! Reachability probe for a bus endpoint.

use std::sync::Arc;
use std::time::Duration;

use snapwire_config::ConnectionConfig;
use stomp::{redact_url, BusTransport, ConnectOptions, WsTransport};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::stats::StatisticsTracker;

/// Hard ceiling on the whole probe, success or not.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed heart-beat advertised during the probe.
const TEST_HEARTBEAT_MS: u32 = 10_000;

/// Verifies reachability of the bus endpoint without consuming data.
pub struct ConnectionTester<T = WsTransport> {
    transport: T,
    stats: Arc<StatisticsTracker>,
}

impl ConnectionTester<WsTransport> {
    pub fn new(stats: Arc<StatisticsTracker>) -> Self {
        Self::with_transport(WsTransport, stats)
    }
}

impl<T: BusTransport> ConnectionTester<T> {
    pub fn with_transport(transport: T, stats: Arc<StatisticsTracker>) -> Self {
        Self { transport, stats }
    }

    /// Transient connect/disconnect probe.
    ///
    /// Resolves `true` the instant the connect handshake completes; the
    /// session teardown is fire-and-forget since success has already been
    /// communicated. Protocol errors, transport errors, and the 10 s hard
    /// timeout all resolve `false`. Exactly one outcome resolves the call.
    pub async fn test_connection(&self, cfg: &ConnectionConfig) -> bool {
        if let Err(e) = cfg.validate() {
            warn!(error = %e, "connection test rejected by validation");
            return false;
        }

        let opts = ConnectOptions {
            heartbeat: (TEST_HEARTBEAT_MS, TEST_HEARTBEAT_MS),
            connect_timeout: TEST_TIMEOUT,
        };

        match timeout(
            TEST_TIMEOUT,
            self.transport.connect(&cfg.websocket_url, &opts),
        )
        .await
        {
            Ok(Ok(mut session)) => {
                self.stats.record_connection();
                info!(
                    url = %redact_url(&cfg.websocket_url),
                    "connection test succeeded"
                );
                tokio::spawn(async move {
                    session.disconnect().await;
                });
                true
            }
            Ok(Err(e)) => {
                self.stats.record_disconnection();
                warn!(
                    url = %redact_url(&cfg.websocket_url),
                    error = %e,
                    "connection test failed"
                );
                false
            }
            Err(_) => {
                self.stats.record_disconnection();
                warn!(
                    url = %redact_url(&cfg.websocket_url),
                    "connection test timed out"
                );
                false
            }
        }
    }
}
