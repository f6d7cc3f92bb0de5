use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rw_consensus::{ConsensusPolicy, PolicySpec};
use rw_signature::Address;
use serde::{Deserialize, Serialize};

use crate::{load_layered_yaml, LoadedConfig};

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_onchain_retries() -> u32 {
    2
}

fn default_interval_s() -> u64 {
    60
}

fn default_addr() -> String {
    "127.0.0.1:8899".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Connector id; becomes `sourceId` when a payload omits `source`.
    pub id: String,
    pub url: String,
    /// Address readings must be signed by. Absent => signatures not required.
    #[serde(default)]
    pub expected_signer: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub primary: SourceConfig,
    #[serde(default)]
    pub secondary: Option<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnchainConfig {
    /// Enforcement reader endpoint (decoded snapshot JSON).
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts at `finalized` before falling back to `latest`.
    #[serde(default = "default_onchain_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    #[serde(default = "default_interval_s")]
    pub interval_s: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_s: default_interval_s(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// Typed monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub consensus: PolicySpec,
    pub sources: SourcesConfig,
    pub onchain: OnchainConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// A config that passed every check, with its validated policy and hash.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: MonitorConfig,
    pub policy: ConsensusPolicy,
    pub config_hash: String,
}

impl MonitorConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the monitor schema")
    }

    /// All checks that can fail a deployment. Returns the validated policy.
    pub fn validate(&self) -> Result<ConsensusPolicy> {
        let policy = self
            .consensus
            .validate()
            .context("CONFIG_INVALID_POLICY")?;

        check_source("sources.primary", &self.sources.primary)?;
        if let Some(s) = &self.sources.secondary {
            check_source("sources.secondary", s)?;
            if s.id == self.sources.primary.id {
                bail!("CONFIG_INVALID sources: primary and secondary share id '{}'", s.id);
            }
        }

        check_url("onchain.url", &self.onchain.url)?;
        if self.onchain.timeout_ms == 0 {
            bail!("CONFIG_INVALID onchain.timeout_ms must be > 0");
        }
        if self.poll.interval_s == 0 {
            bail!("CONFIG_INVALID poll.interval_s must be > 0");
        }
        Ok(policy)
    }
}

fn check_source(at: &str, s: &SourceConfig) -> Result<()> {
    if s.id.trim().is_empty() {
        bail!("CONFIG_INVALID {at}.id must not be empty");
    }
    check_url(&format!("{at}.url"), &s.url)?;
    if s.timeout_ms == 0 {
        bail!("CONFIG_INVALID {at}.timeout_ms must be > 0");
    }
    if let Some(signer) = s.expected_signer.as_deref() {
        if !signer.trim().is_empty() {
            Address::from_str(signer)
                .with_context(|| format!("CONFIG_INVALID {at}.expected_signer"))?;
        }
    }
    Ok(())
}

fn check_url(at: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("CONFIG_INVALID {at} must be an http(s) url, got '{url}'");
    }
    Ok(())
}

/// Load, merge, type-check and validate layered config files.
pub fn load_monitor_config(paths: &[&str]) -> Result<ValidatedConfig> {
    let loaded = load_layered_yaml(paths)?;
    let config = MonitorConfig::from_loaded(&loaded)?;
    let policy = config.validate()?;
    Ok(ValidatedConfig {
        config,
        policy,
        config_hash: loaded.config_hash,
    })
}
