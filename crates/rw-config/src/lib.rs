//! rw-config
//!
//! Layered YAML configuration for the monitor.
//!
//! - Layers apply in order; each later layer overrides leaves of the ones
//!   before it, objects merge key by key.
//! - The merged tree is rendered with sorted keys as compact JSON and its
//!   SHA-256 is the `config_hash` reported by status and attestation output.
//! - Signing keys and provider credentials never live in config files. A
//!   leaf shaped like one aborts the load (see [`secrets`]).
//! - [`MonitorConfig`] is the typed view; unknown keys and malformed policy
//!   values are errors, never defaults.

mod monitor;
pub mod secrets;

pub use monitor::{
    load_monitor_config, DaemonConfig, MonitorConfig, OnchainConfig, PollConfig, SourceConfig,
    SourcesConfig, ValidatedConfig,
};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A merged config tree plus its canonical rendering and hash.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let layers = paths
        .iter()
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("failed to read config {p}")))
        .collect::<Result<Vec<String>>>()?;
    let refs: Vec<&str> = layers.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let merged = yaml_docs.iter().enumerate().try_fold(
        Value::Object(Map::new()),
        |acc, (i, raw)| -> Result<Value> {
            let layer: serde_yaml::Value =
                serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
            let layer = serde_json::to_value(layer).context("yaml layer is not valid json")?;
            Ok(overlay(acc, layer))
        },
    )?;

    if let Some((leaf, kind)) = secrets::find_secret(&merged) {
        bail!(
            "CONFIG_SECRET_DETECTED leaf={leaf} kind={} value=REDACTED",
            kind.as_str()
        );
    }

    let canonical_json = serde_json::to_string(&canonical_form(&merged))
        .context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// `top` wins on every leaf; objects merge key by key.
fn overlay(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut base), Value::Object(top)) => {
            for (key, value) in top {
                let merged = match base.remove(&key) {
                    Some(prev) => overlay(prev, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, top) => top,
    }
}

/// Same tree with every object's keys in sorted order.
fn canonical_form(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonical_form(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_form).collect()),
        other => other.clone(),
    }
}
