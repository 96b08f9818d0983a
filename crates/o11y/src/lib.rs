//! Observability bootstrap: tracing, panic hook, metrics exporter.
//!
//! Binaries call [`init_all`] once at startup; libraries only emit
//! `tracing` events and `metrics` counters and stay unaware of how either
//! is installed.

pub mod logging;
pub mod metrics;
pub mod panic;

/// Aggregate observability configuration.
#[derive(Clone, Debug, Default)]
pub struct O11yConfig {
    pub logging: logging::Config,
    pub metrics: metrics::Config,
    pub install_panic_hook: bool,
}

/// Initialize logging, the metrics exporter, and the panic hook.
/// Idempotent: repeated calls are no-ops past the first.
pub fn init_all(cfg: &O11yConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&cfg.logging)?;
    metrics::init(&cfg.metrics);
    if cfg.install_panic_hook {
        panic::install_hook();
    }
    Ok(())
}
