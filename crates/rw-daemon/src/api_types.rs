//! Request and response types for all rw-daemon HTTP endpoints.
//!
//! No business logic lives here.

use rw_consensus::PolicySpec;
use rw_engine::{Attestation, EvaluationInputs};
use rw_schemas::{IncidentSeverity, RawReservePayload};
use rw_signature::Address;
use rw_status::DerivedStatus;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors (4xx / 503)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// /v1/preview
// ---------------------------------------------------------------------------

/// Evaluate caller-supplied inputs without touching daemon state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub inputs: EvaluationInputs,
    /// Draft policy; the daemon's own policy when absent.
    #[serde(default)]
    pub policy: Option<PolicySpec>,
    /// Evaluation instant; server clock when absent.
    #[serde(default)]
    pub now_unix_s: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub derived: DerivedStatus,
    pub attestation: Option<Attestation>,
    /// Why no attestation could be produced.
    pub attestation_blocked: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/verify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub payload: RawReservePayload,
    /// Connector id used when the payload omits `source`.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub expected_signer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: Option<bool>,
    pub recovered_signer: Option<Address>,
    pub error: Option<String>,
    /// The canonical message the signature was checked against.
    pub message: String,
}

// ---------------------------------------------------------------------------
// /v1/incident
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenIncidentRequest {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub severity: IncidentSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearIncidentResponse {
    pub cleared: bool,
}
