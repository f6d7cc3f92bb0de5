use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use rw_consensus::{SelectedReading, SourceAssessment};
use rw_coverage::{CoverageSource, MinimumSource};
use rw_schemas::Incident;
use serde::{Deserialize, Serialize};

/// One independent failure signal.
///
/// Ordering is only used for deterministic set iteration; it carries no
/// severity meaning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    OnchainUnavailable,
    ReserveDataStale,
    ReserveSignatureInvalid,
    ReserveSourceMismatch,
    EnforcementNotWired,
    ForwarderNotSet,
    MintingPaused,
    MintingDisabled,
    CoverageBelowThreshold,
    IncidentActive,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 10] = [
        ReasonCode::OnchainUnavailable,
        ReasonCode::ReserveDataStale,
        ReasonCode::ReserveSignatureInvalid,
        ReasonCode::ReserveSourceMismatch,
        ReasonCode::EnforcementNotWired,
        ReasonCode::ForwarderNotSet,
        ReasonCode::MintingPaused,
        ReasonCode::MintingDisabled,
        ReasonCode::CoverageBelowThreshold,
        ReasonCode::IncidentActive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::OnchainUnavailable => "onchain_unavailable",
            ReasonCode::ReserveDataStale => "reserve_data_stale",
            ReasonCode::ReserveSignatureInvalid => "reserve_signature_invalid",
            ReasonCode::ReserveSourceMismatch => "reserve_source_mismatch",
            ReasonCode::EnforcementNotWired => "enforcement_not_wired",
            ReasonCode::ForwarderNotSet => "forwarder_not_set",
            ReasonCode::MintingPaused => "minting_paused",
            ReasonCode::MintingDisabled => "minting_disabled",
            ReasonCode::CoverageBelowThreshold => "coverage_below_threshold",
            ReasonCode::IncidentActive => "incident_active",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Stale,
    Unhealthy,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Healthy => "HEALTHY",
            SystemStatus::Degraded => "DEGRADED",
            SystemStatus::Stale => "STALE",
            SystemStatus::Unhealthy => "UNHEALTHY",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source reading ages in seconds at evaluation time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ages {
    pub primary: Option<i64>,
    pub secondary: Option<i64>,
}

/// Numeric diagnostics carried alongside the status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub ages: Ages,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub mismatch_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub mismatch_usd: Option<Decimal>,
    pub selected: Option<SelectedReading>,
    pub resolved_coverage_bps: Option<u64>,
    pub coverage_source: CoverageSource,
    pub min_coverage_bps: Option<u64>,
    pub minimum_source: MinimumSource,
    pub primary: SourceAssessment,
    pub secondary: SourceAssessment,
    /// On-chain read error, when the snapshot was unavailable.
    pub onchain_error: Option<String>,
}

/// Output of one evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStatus {
    pub status: SystemStatus,
    pub reasons: BTreeSet<ReasonCode>,
    pub diagnostics: Diagnostics,
    pub incident: Option<Incident>,
    pub evaluated_at_unix_s: i64,
}

impl DerivedStatus {
    pub fn has(&self, reason: ReasonCode) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn is_healthy(&self) -> bool {
        self.status == SystemStatus::Healthy
    }

    /// Reason codes in stable string form.
    pub fn reason_strs(&self) -> Vec<&'static str> {
        self.reasons.iter().map(ReasonCode::as_str).collect()
    }
}
