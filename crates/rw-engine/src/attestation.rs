use std::fmt;

use rust_decimal::Decimal;
use rw_coverage::CoverageSource;
use rw_schemas::EnforcementSnapshot;
use rw_status::{DerivedStatus, ReasonCode, SystemStatus};
use serde::{Deserialize, Serialize};

/// Values handed to the on-chain writer. Wire encoding is the writer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// Reserve text exactly as the selected source reported (and signed) it.
    pub reserve_usd: String,
    pub nav_usd: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub liability_supply: Decimal,
    pub coverage_bps: u64,
    /// Timestamp of the selected reading.
    pub as_of_timestamp: i64,
    pub breaker_triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationBlocked {
    /// The data could not be trusted (STALE); nothing is attested.
    Untrusted,
    NoSelectedReading,
    LiabilitySupplyUnknown,
    /// Coverage was not computed from the selected reading.
    CoverageNotComputed,
}

impl fmt::Display for AttestationBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttestationBlocked::Untrusted => write!(f, "status is STALE; refusing to attest"),
            AttestationBlocked::NoSelectedReading => write!(f, "no reserve reading was selected"),
            AttestationBlocked::LiabilitySupplyUnknown => {
                write!(f, "liability supply is unknown")
            }
            AttestationBlocked::CoverageNotComputed => {
                write!(f, "coverage was not computed from the selected reading")
            }
        }
    }
}

impl std::error::Error for AttestationBlocked {}

/// Attestation values for a finished evaluation.
///
/// `snapshot` must be the enforcement snapshot that evaluation consumed.
pub fn attestation_for(
    derived: &DerivedStatus,
    snapshot: &EnforcementSnapshot,
) -> Result<Attestation, AttestationBlocked> {
    if derived.status == SystemStatus::Stale {
        return Err(AttestationBlocked::Untrusted);
    }
    let selected = derived
        .diagnostics
        .selected
        .as_ref()
        .ok_or(AttestationBlocked::NoSelectedReading)?;
    let liability_supply = snapshot
        .liability_supply
        .ok_or(AttestationBlocked::LiabilitySupplyUnknown)?;
    let coverage_bps = match (
        derived.diagnostics.coverage_source,
        derived.diagnostics.resolved_coverage_bps,
    ) {
        (CoverageSource::Computed, Some(bps)) => bps,
        _ => return Err(AttestationBlocked::CoverageNotComputed),
    };

    Ok(Attestation {
        reserve_usd: selected.reading.reserve_usd.text.clone(),
        nav_usd: selected.reading.nav_usd.as_ref().map(|n| n.text.clone()),
        liability_supply,
        coverage_bps,
        as_of_timestamp: selected.reading.timestamp_unix_s,
        breaker_triggered: derived.has(ReasonCode::CoverageBelowThreshold),
    })
}
