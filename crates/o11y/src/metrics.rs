use std::net::SocketAddr;
use std::sync::Once;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

static INIT: Once = Once::new();

#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Prometheus scrape listener, e.g. `0.0.0.0:9095`. Disabled when unset.
    pub listener: Option<SocketAddr>,
}

/// Install the Prometheus exporter when a listener is configured.
/// `counter!` calls are no-ops otherwise.
pub fn init(cfg: &Config) {
    let Some(addr) = cfg.listener else {
        return;
    };
    INIT.call_once(|| {
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => info!(%addr, "prometheus exporter listening"),
            Err(e) => warn!(%addr, error = %e, "failed to install prometheus exporter"),
        }
    });
}
