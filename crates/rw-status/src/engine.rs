use std::collections::BTreeSet;

use rw_consensus::ResolveOutcome;
use rw_coverage::CoverageOutcome;
use rw_schemas::{EnforcementSnapshot, Incident, IncidentSeverity};

use crate::{Ages, DerivedStatus, Diagnostics, ReasonCode, SystemStatus};

/// Collect every applicable reason code.
pub fn reasons_for(
    resolved: &ResolveOutcome,
    coverage: &CoverageOutcome,
    snapshot: &EnforcementSnapshot,
    incident: Option<&Incident>,
) -> BTreeSet<ReasonCode> {
    let mut reasons = BTreeSet::new();

    if resolved.stale {
        reasons.insert(ReasonCode::ReserveDataStale);
    }
    if resolved.signature_invalid {
        reasons.insert(ReasonCode::ReserveSignatureInvalid);
    }
    if resolved.mismatch {
        reasons.insert(ReasonCode::ReserveSourceMismatch);
    }

    if snapshot.is_available() {
        // Unreported flags (None) are not judged.
        if snapshot.hook_wired == Some(false) {
            reasons.insert(ReasonCode::EnforcementNotWired);
        }
        if snapshot.forwarder_set == Some(false) {
            reasons.insert(ReasonCode::ForwarderNotSet);
        }
        if snapshot.minting_paused == Some(true) {
            reasons.insert(ReasonCode::MintingPaused);
        }
        if snapshot.minting_enabled == Some(false) {
            reasons.insert(ReasonCode::MintingDisabled);
        }
    } else {
        reasons.insert(ReasonCode::OnchainUnavailable);
    }

    if coverage.breach() {
        reasons.insert(ReasonCode::CoverageBelowThreshold);
    }
    if incident.is_some() {
        reasons.insert(ReasonCode::IncidentActive);
    }

    reasons
}

/// Strict priority over a reason set. First matching tier wins.
///
/// `incident_severity` only matters when `incident_active` is present: a
/// critical incident ranks UNHEALTHY, anything else DEGRADED.
pub fn classify(
    reasons: &BTreeSet<ReasonCode>,
    incident_severity: Option<IncidentSeverity>,
) -> SystemStatus {
    let has = |r: ReasonCode| reasons.contains(&r);
    let incident = has(ReasonCode::IncidentActive);
    let critical_incident = incident && incident_severity.is_some_and(|s| s.is_critical());

    if has(ReasonCode::OnchainUnavailable)
        || has(ReasonCode::ReserveDataStale)
        || has(ReasonCode::ReserveSignatureInvalid)
    {
        return SystemStatus::Stale;
    }

    if has(ReasonCode::ReserveSourceMismatch)
        || has(ReasonCode::EnforcementNotWired)
        || has(ReasonCode::ForwarderNotSet)
        || (incident && !critical_incident)
    {
        return SystemStatus::Degraded;
    }

    if has(ReasonCode::CoverageBelowThreshold)
        || has(ReasonCode::MintingPaused)
        || has(ReasonCode::MintingDisabled)
        || critical_incident
    {
        return SystemStatus::Unhealthy;
    }

    SystemStatus::Healthy
}

/// Build a fresh [`DerivedStatus`] from one evaluation's stage outputs.
pub fn derive(
    resolved: &ResolveOutcome,
    coverage: &CoverageOutcome,
    snapshot: &EnforcementSnapshot,
    incident: Option<&Incident>,
    evaluated_at_unix_s: i64,
) -> DerivedStatus {
    let reasons = reasons_for(resolved, coverage, snapshot, incident);
    let status = classify(&reasons, incident.map(|i| i.severity));

    let diagnostics = Diagnostics {
        ages: Ages {
            primary: resolved.primary.age_s,
            secondary: resolved.secondary.age_s,
        },
        mismatch_ratio: resolved.mismatch_ratio,
        mismatch_usd: resolved.mismatch_usd,
        selected: resolved.selected.clone(),
        resolved_coverage_bps: coverage.coverage_bps,
        coverage_source: coverage.coverage_source,
        min_coverage_bps: coverage.min_coverage_bps,
        minimum_source: coverage.minimum_source,
        primary: resolved.primary.clone(),
        secondary: resolved.secondary.clone(),
        onchain_error: snapshot.error.clone(),
    };

    DerivedStatus {
        status,
        reasons,
        diagnostics,
        incident: incident.cloned(),
        evaluated_at_unix_s,
    }
}
