use std::fmt;

use rw_consensus::{parse_reading, resolve, ConsensusPolicy, PolicyError, PolicySpec, SourceInput};
use rw_coverage::CoverageInput;
use rw_schemas::{EnforcementSnapshot, FetchOutcome, Incident};
use rw_signature::verify;
use rw_status::{derive, DerivedStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One configured source slot and what its fetch produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSlot {
    /// Connector id; used as `sourceId` when the payload omits `source`.
    pub connector_id: String,
    /// Empty / absent => signatures are not required for this source.
    #[serde(default)]
    pub expected_signer: Option<String>,
    pub outcome: FetchOutcome,
}

impl SourceSlot {
    pub fn new(
        connector_id: impl Into<String>,
        expected_signer: Option<String>,
        outcome: FetchOutcome,
    ) -> Self {
        Self {
            connector_id: connector_id.into(),
            expected_signer,
            outcome,
        }
    }

    pub fn not_configured() -> Self {
        Self {
            connector_id: String::new(),
            expected_signer: None,
            outcome: FetchOutcome::NotConfigured,
        }
    }
}

/// Everything one evaluation consumes, besides the policy and `now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationInputs {
    pub primary: SourceSlot,
    #[serde(default = "SourceSlot::not_configured")]
    pub secondary: SourceSlot,
    pub snapshot: EnforcementSnapshot,
    #[serde(default)]
    pub incident: Option<Incident>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The consensus policy is malformed. Never recovered with defaults.
    Policy(PolicyError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Policy(e) => write!(f, "invalid consensus policy: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Policy(e) => Some(e),
        }
    }
}

impl From<PolicyError> for EngineError {
    fn from(e: PolicyError) -> Self {
        EngineError::Policy(e)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Validate and verify one slot into a resolver input.
pub fn source_input(slot: &SourceSlot) -> SourceInput {
    match &slot.outcome {
        FetchOutcome::NotConfigured => SourceInput::NotConfigured,
        FetchOutcome::Failed { error } => SourceInput::Unavailable {
            error: error.clone(),
        },
        FetchOutcome::Fetched { payload } => match parse_reading(payload, &slot.connector_id) {
            Err(e) => SourceInput::Invalid {
                error: e.to_string(),
            },
            Ok(reading) => {
                let signature = verify(&reading.signed_fields(), slot.expected_signer.as_deref());
                SourceInput::Read { reading, signature }
            }
        },
    }
}

/// Validate `policy`, then evaluate.
pub fn evaluate(
    inputs: &EvaluationInputs,
    policy: &PolicySpec,
    now_unix_s: i64,
) -> Result<DerivedStatus, EngineError> {
    let policy = policy.validate()?;
    Ok(evaluate_with_policy(inputs, &policy, now_unix_s))
}

/// Evaluate under an already-validated policy.
pub fn evaluate_with_policy(
    inputs: &EvaluationInputs,
    policy: &ConsensusPolicy,
    now_unix_s: i64,
) -> DerivedStatus {
    let primary = source_input(&inputs.primary);
    let secondary = source_input(&inputs.secondary);
    let resolved = resolve(&primary, &secondary, policy, now_unix_s);

    let snapshot = &inputs.snapshot;
    // Values from a failed on-chain read are not trusted.
    let onchain = snapshot.is_available();
    let coverage = rw_coverage::evaluate(&CoverageInput {
        resolved_reserve_usd: resolved.selected_reserve_usd(),
        liability_supply: snapshot.liability_supply.filter(|_| onchain),
        onchain_coverage_bps: snapshot.coverage_bps.filter(|_| onchain),
        min_coverage_bps_override: policy.min_coverage_bps,
        onchain_min_coverage_bps: snapshot.min_coverage_bps.filter(|_| onchain),
    });

    derive(
        &resolved,
        &coverage,
        snapshot,
        inputs.incident.as_ref(),
        now_unix_s,
    )
}
