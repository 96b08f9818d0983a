//! Datasource connection configuration.
//!
//! A [`ConnectionConfig`] describes one snapshot acquisition: where the bus
//! lives, which topic to listen on, how the snapshot is triggered, and how
//! its end is detected. Field names follow the camelCase wire contract used
//! by the configuration documents, so a stored datasource config
//! deserializes directly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapwire_core::SnapshotError;
use std::fs;
use std::time::Duration;
use tracing::error;
use walkdir::WalkDir;

/// One named datasource entry as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceSpec {
    pub metadata: Metadata,
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Datasource name (unique).
    pub name: String,
}

/// Immutable per-operation connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    /// Bus endpoint, e.g. `ws://broker:15674/ws`.
    pub websocket_url: String,

    /// Topic the snapshot rows arrive on.
    pub listener_topic: String,

    /// Optional trigger topic; when set, the engine publishes
    /// `request_body` to it after subscribing.
    pub request_message: Option<String>,

    /// Trigger payload.
    pub request_body: String,

    /// Sentinel token that marks end-of-snapshot.
    pub snapshot_end_token: String,

    /// Field whose value identifies a logical row; later emissions with the
    /// same key replace earlier ones.
    pub key_column: Option<String>,

    /// Target row rate hint (informational only).
    pub message_rate: Option<u64>,

    /// Overall snapshot timeout in milliseconds.
    pub snapshot_timeout_ms: u64,

    /// Opaque label describing the payload type.
    pub data_type: Option<String>,

    /// Server-side batch size hint.
    pub batch_size: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            websocket_url: String::new(),
            listener_topic: String::new(),
            request_message: None,
            request_body: default_request_body(),
            snapshot_end_token: default_end_token(),
            key_column: None,
            message_rate: None,
            snapshot_timeout_ms: default_timeout_ms(),
            data_type: None,
            batch_size: None,
        }
    }
}

fn default_request_body() -> String {
    "START".to_owned()
}

fn default_end_token() -> String {
    "Success".to_owned()
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl ConnectionConfig {
    /// Fail fast on configs that cannot possibly connect.
    ///
    /// Called by the engine before any connection attempt so a missing URL
    /// surfaces as a configuration failure, not a transport one.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.websocket_url.trim().is_empty() {
            return Err(SnapshotError::Config {
                details: "websocketUrl is required".into(),
            });
        }
        if self.listener_topic.trim().is_empty() {
            return Err(SnapshotError::Config {
                details: "listenerTopic is required".into(),
            });
        }
        Ok(())
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}

pub fn load_from_path(file_path: &str) -> Result<DatasourceSpec> {
    let raw = fs::read_to_string(file_path)
        .with_context(|| format!("reading config {file_path}"))?;
    let with_env = shellexpand::env(&raw)
        .with_context(|| "expanding environment variables")?
        .to_string();
    let spec: DatasourceSpec =
        serde_yaml::from_str(&with_env).with_context(|| "parsing yaml")?;

    Ok(spec)
}

pub fn load_from_dir(dir_path: &str) -> Result<Vec<DatasourceSpec>> {
    let mut specs = Vec::<DatasourceSpec>::new();
    for entry in WalkDir::new(dir_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if let Some(path_str) = entry.path().to_str() {
            let spec = load_from_path(path_str).with_context(|| {
                format!("loading datasource from {:?}", entry.path())
            })?;
            specs.push(spec);
        } else {
            error!(file = %entry.path().display(), "skipping file in config dir")
        }
    }

    Ok(specs)
}

pub fn load_cfg(path: &str) -> Result<Vec<DatasourceSpec>> {
    let cfg_path = std::path::Path::new(path);

    match cfg_path.is_dir() {
        true => load_from_dir(path),
        false => {
            let spec = load_from_path(path)?;
            Ok(vec![spec])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_contract() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.request_body, "START");
        assert_eq!(cfg.snapshot_end_token, "Success");
        assert_eq!(cfg.snapshot_timeout_ms, 60_000);
        assert!(cfg.key_column.is_none());
    }

    #[test]
    fn deserializes_camel_case_document() {
        let cfg: ConnectionConfig = serde_json::from_str(
            r#"{
                "websocketUrl": "ws://broker:15674/ws",
                "listenerTopic": "/topic/prices",
                "requestMessage": "/topic/prices.request",
                "keyColumn": "id",
                "snapshotTimeoutMs": 5000
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.websocket_url, "ws://broker:15674/ws");
        assert_eq!(cfg.listener_topic, "/topic/prices");
        assert_eq!(cfg.request_message.as_deref(), Some("/topic/prices.request"));
        assert_eq!(cfg.key_column.as_deref(), Some("id"));
        assert_eq!(cfg.snapshot_timeout_ms, 5000);
        // Unspecified fields fall back to their defaults.
        assert_eq!(cfg.request_body, "START");
        assert_eq!(cfg.snapshot_end_token, "Success");
    }

    #[test]
    fn validate_rejects_missing_url() {
        let cfg = ConnectionConfig {
            listener_topic: "/topic/a".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("websocketUrl"));
    }

    #[test]
    fn validate_rejects_missing_topic() {
        let cfg = ConnectionConfig {
            websocket_url: "ws://broker/ws".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("listenerTopic"));
    }

    #[test]
    fn yaml_spec_parses() {
        let spec: DatasourceSpec = serde_yaml::from_str(
            r#"
metadata:
  name: prices
connection:
  websocketUrl: ws://broker:15674/ws
  listenerTopic: /topic/prices
  dataType: fx
"#,
        )
        .unwrap();
        assert_eq!(spec.metadata.name, "prices");
        assert_eq!(spec.connection.data_type.as_deref(), Some("fx"));
        assert!(spec.connection.validate().is_ok());
    }
}
