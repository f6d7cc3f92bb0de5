//! rw-schemas
//!
//! Wire-level shapes exchanged with collaborators:
//! - reserve source HTTP payloads (as fetched, before validation)
//! - decoded on-chain enforcement snapshots
//! - operator incidents
//!
//! No business logic lives here. Fields that collaborators may omit are
//! `Option`; fields whose JSON type varies between sources (numbers vs.
//! decimal strings) are kept as raw `serde_json::Value` so validation can
//! decide what is well-formed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Reserve source payload
// ---------------------------------------------------------------------------

/// A reserve report exactly as returned by a source's HTTP endpoint.
///
/// `{timestamp, reserveUsd, navUsd?, source?, signer?, signature?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReservePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_usd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_usd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Result of fetching one reserve source.
///
/// Transport failures are values, not errors: a source outage must degrade
/// the status, never abort the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The source answered with a decodable JSON body.
    Fetched { payload: RawReservePayload },
    /// Timeout, non-2xx, connection or body-decode failure.
    Failed { error: String },
    /// No connector is configured in this slot (e.g. no secondary source).
    NotConfigured,
}

impl FetchOutcome {
    pub fn fetched(payload: RawReservePayload) -> Self {
        FetchOutcome::Fetched { payload }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        FetchOutcome::Failed {
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enforcement snapshot
// ---------------------------------------------------------------------------

/// Decoded on-chain enforcement state.
///
/// Every reading is optional: `None` means the value was not reported, which
/// is distinct from an explicit `false`. When `error` is set the read failed
/// and the remaining fields must not be trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementSnapshot {
    #[serde(default)]
    pub coverage_bps: Option<u64>,
    #[serde(default)]
    pub min_coverage_bps: Option<u64>,
    #[serde(default)]
    pub minting_paused: Option<bool>,
    #[serde(default)]
    pub minting_enabled: Option<bool>,
    #[serde(default)]
    pub hook_wired: Option<bool>,
    #[serde(default)]
    pub forwarder_set: Option<bool>,
    /// Outstanding token supply in whole-token units (1 token = 1 USD of liability).
    /// Decodes from a JSON number or a decimal string; always encodes as a string.
    #[serde(default, with = "decimal_str_or_number")]
    pub liability_supply: Option<Decimal>,
    /// Block tag the values were read at (`finalized` or `latest`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_tag: Option<String>,
    /// Transport / RPC failure. Set => the snapshot is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnforcementSnapshot {
    /// Snapshot representing a failed on-chain read.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// `Option<Decimal>` that accepts `1000000`, `1000000.25`, `"1000000.25"` or
/// `null`, and serialises as a string.
mod decimal_str_or_number {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(v: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::str_option::serialize(v, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        let text = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "expected a decimal number or string, got {other}"
                )))
            }
        };
        let t = text.trim();
        Decimal::from_str(t)
            .or_else(|_| Decimal::from_scientific(t))
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid decimal '{t}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Minor,
    Major,
    Critical,
}

impl IncidentSeverity {
    pub fn is_critical(&self) -> bool {
        matches!(self, IncidentSeverity::Critical)
    }
}

/// An operator-declared incident. Presence means the incident is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub severity: IncidentSeverity,
    #[serde(default)]
    pub opened_at_unix_s: Option<i64>,
}
