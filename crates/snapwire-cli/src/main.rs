//! `snapwire` — drive the snapshot pipeline from the command line:
//! test-connection, fetch a snapshot, or run the full sense pass
//! (snapshot → infer → persist to the config store).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config_store::{ConfigStoreExt, FieldDocument, FileConfigStore};
use ingest::{ConnectionTester, SnapshotIngestor, StatisticsTracker};
use snapwire_config::{load_cfg, DatasourceSpec};
use snapwire_core::{IngestionResult, OnBatch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "snapwire", about = "STOMP snapshot ingestion and schema sensing")]
struct Args {
    /// Datasource config file or directory of configs.
    #[arg(short, long)]
    config: String,

    /// Prometheus scrape listener, e.g. 0.0.0.0:9095.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe each configured endpoint without consuming data.
    Test,

    /// Fetch a snapshot and print the result as JSON.
    Snapshot {
        #[arg(long, default_value_t = 500)]
        max_rows: usize,
    },

    /// Fetch a snapshot, infer the schema, and persist the field document.
    Sense {
        #[arg(long, default_value_t = 500)]
        max_rows: usize,

        /// Config store file the field documents are written to.
        #[arg(long, default_value = "./data/datasources.json")]
        store: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let o11y_cfg = o11y::O11yConfig {
        logging: o11y::logging::Config {
            level: None,
            json: args.json_logs,
            with_targets: false,
        },
        metrics: o11y::metrics::Config {
            listener: args.metrics_addr,
        },
        install_panic_hook: true,
    };
    let _ = o11y::init_all(&o11y_cfg);

    let specs = load_cfg(&args.config).context("load datasource specs")?;
    if specs.is_empty() {
        bail!("no datasource specs found at {}", args.config);
    }
    info!(specs_found = specs.len(), "datasource specs loaded");
    debug!(specs = ?specs, "datasource spec detail");

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match args.command {
        Command::Test => run_test(&specs).await,
        Command::Snapshot { max_rows } => {
            run_snapshot(&specs, max_rows, cancel).await
        }
        Command::Sense { max_rows, store } => {
            run_sense(&specs, max_rows, &store, cancel).await
        }
    }
}

/// Cancel in-flight snapshots on Ctrl-C instead of killing mid-teardown.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight snapshots");
            cancel.cancel();
        }
    });
}

async fn run_test(specs: &[DatasourceSpec]) -> Result<()> {
    let stats = Arc::new(StatisticsTracker::new());
    let tester = ConnectionTester::new(stats);

    let mut failures = 0usize;
    for spec in specs {
        let reachable = tester.test_connection(&spec.connection).await;
        println!(
            "{}: {}",
            spec.metadata.name,
            if reachable { "ok" } else { "unreachable" }
        );
        if !reachable {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} endpoints unreachable", specs.len());
    }
    Ok(())
}

async fn run_snapshot(
    specs: &[DatasourceSpec],
    max_rows: usize,
    cancel: CancellationToken,
) -> Result<()> {
    let mut any_failed = false;
    for spec in specs {
        let result = fetch_one(spec, max_rows, cancel.clone()).await;
        any_failed |= !result.success;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    if any_failed {
        bail!("one or more snapshots failed");
    }
    Ok(())
}

async fn run_sense(
    specs: &[DatasourceSpec],
    max_rows: usize,
    store_path: &str,
    cancel: CancellationToken,
) -> Result<()> {
    if let Some(parent) = std::path::Path::new(store_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let store = FileConfigStore::new(store_path)?;

    for spec in specs {
        let name = &spec.metadata.name;
        let result = fetch_one(spec, max_rows, cancel.clone()).await;

        if !result.success {
            bail!(
                "snapshot for {name} failed: {}",
                result.error.unwrap_or_else(|| "unknown error".into())
            );
        }
        if result.data.is_empty() {
            warn!(datasource = %name, "snapshot returned no rows, skipping inference");
            continue;
        }

        let tree = schema_infer::infer(&result.data);
        let doc = FieldDocument::from_inference(
            spec.connection.data_type.clone(),
            tree,
            result.data.len(),
        );
        info!(
            datasource = %name,
            fields = doc.fields.len(),
            columns = doc.columns.len(),
            "field document inferred"
        );
        store.put(name, &doc).await?;
        println!(
            "{name}: {} fields, {} columns from {} rows",
            doc.fields.len(),
            doc.columns.len(),
            doc.sampled_rows
        );
    }
    Ok(())
}

async fn fetch_one(
    spec: &DatasourceSpec,
    max_rows: usize,
    cancel: CancellationToken,
) -> IngestionResult {
    let name = spec.metadata.name.clone();
    info!(datasource = %name, max_rows, "fetching snapshot");

    let stats = Arc::new(StatisticsTracker::new());
    let ingestor = SnapshotIngestor::new(stats.clone());

    let progress: OnBatch = Box::new(move |batch, total| {
        debug!(
            datasource = %name,
            batch = batch.len(),
            total,
            "snapshot progress"
        );
    });

    let result = ingestor
        .fetch_snapshot_with_cancel(
            &spec.connection,
            max_rows,
            Some(progress),
            cancel,
        )
        .await;

    let view = stats.snapshot();
    info!(
        datasource = %spec.metadata.name,
        success = result.success,
        rows = result.row_count(),
        bytes = view.snapshot_bytes_received,
        "snapshot finished"
    );
    result
}
