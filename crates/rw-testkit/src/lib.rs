//! rw-testkit
//!
//! Shared test tooling: a deterministic secp256k1 signer that produces real
//! reserve signatures, and fixture builders for payloads, slots and
//! enforcement snapshots.
//!
//! Signing lives here and only here. Production crates verify; they never sign.

use k256::ecdsa::SigningKey;
use rw_engine::{EvaluationInputs, SourceSlot};
use rw_schemas::{EnforcementSnapshot, FetchOutcome, RawReservePayload};
use rw_signature::{canonical_message, eip191_hash, Address, SignedFields};
use serde_json::{json, Value};

/// Fixed evaluation instant used across scenario tests.
pub const NOW: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    /// Key whose 32 scalar bytes are all `seed`. `seed` must be non-zero.
    pub fn from_seed(seed: u8) -> Self {
        assert!(seed != 0, "zero is not a valid secp256k1 scalar");
        Self {
            key: SigningKey::from_slice(&[seed; 32]).expect("valid scalar"),
        }
    }

    pub fn address(&self) -> Address {
        Address::from_verifying_key(self.key.verifying_key())
    }

    /// Lowercase `0x`-prefixed address.
    pub fn address_hex(&self) -> String {
        self.address().to_string()
    }

    /// EIP-191 personal_sign over `message`: `0x` + r‖s‖v, v in {27, 28}.
    pub fn sign_message(&self, message: &str) -> String {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&eip191_hash(message))
            .expect("prehash signing");
        let mut out = sig.to_bytes().to_vec();
        out.push(27 + recid.to_byte());
        format!("0x{}", hex::encode(out))
    }

    /// Sign the canonical message for these reading fields.
    pub fn sign_reading(
        &self,
        source_id: &str,
        reserve_usd: &str,
        nav_usd: Option<&str>,
        timestamp_unix_s: i64,
    ) -> String {
        self.sign_message(&canonical_message(&SignedFields {
            source_id,
            reserve_usd,
            nav_usd,
            timestamp_unix_s,
            signer: None,
            signature: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Builder for a reserve source response body.
#[derive(Clone, Debug)]
pub struct PayloadBuilder {
    source: String,
    reserve_usd: String,
    nav_usd: Option<String>,
    timestamp: i64,
    signer: Option<String>,
    signature: Option<String>,
}

impl PayloadBuilder {
    pub fn new(source: &str, reserve_usd: &str, timestamp: i64) -> Self {
        Self {
            source: source.to_string(),
            reserve_usd: reserve_usd.to_string(),
            nav_usd: None,
            timestamp,
            signer: None,
            signature: None,
        }
    }

    pub fn nav(mut self, nav_usd: &str) -> Self {
        self.nav_usd = Some(nav_usd.to_string());
        self
    }

    /// Sign with `signer` and declare it as the signer.
    pub fn signed_by(self, signer: &TestSigner) -> Self {
        let declared = signer.address_hex();
        self.signed_by_declaring(signer, &declared)
    }

    /// Sign with `signer` but declare `declared` (which may be someone else).
    pub fn signed_by_declaring(mut self, signer: &TestSigner, declared: &str) -> Self {
        let sig = signer.sign_reading(
            &self.source,
            &self.reserve_usd,
            self.nav_usd.as_deref(),
            self.timestamp,
        );
        self.signer = Some(declared.to_string());
        self.signature = Some(sig);
        self
    }

    /// Overwrite the reserve after signing (tampered payload).
    pub fn tamper_reserve(mut self, reserve_usd: &str) -> Self {
        self.reserve_usd = reserve_usd.to_string();
        self
    }

    pub fn json(&self) -> Value {
        let mut v = json!({
            "timestamp": self.timestamp,
            "reserveUsd": self.reserve_usd,
            "source": self.source,
        });
        if let Some(n) = &self.nav_usd {
            v["navUsd"] = json!(n);
        }
        if let Some(s) = &self.signer {
            v["signer"] = json!(s);
        }
        if let Some(s) = &self.signature {
            v["signature"] = json!(s);
        }
        v
    }

    pub fn payload(&self) -> RawReservePayload {
        serde_json::from_value(self.json()).expect("builder emits a valid payload")
    }

    pub fn fetched(&self) -> FetchOutcome {
        FetchOutcome::fetched(self.payload())
    }
}

// ---------------------------------------------------------------------------
// Slots / snapshots / inputs
// ---------------------------------------------------------------------------

pub fn slot(
    connector_id: &str,
    expected_signer: Option<&TestSigner>,
    outcome: FetchOutcome,
) -> SourceSlot {
    SourceSlot::new(
        connector_id,
        expected_signer.map(TestSigner::address_hex),
        outcome,
    )
}

/// Enforcement fully wired, minting live, with the given coverage figures.
pub fn wired_snapshot(coverage_bps: u64, min_coverage_bps: u64) -> EnforcementSnapshot {
    EnforcementSnapshot {
        coverage_bps: Some(coverage_bps),
        min_coverage_bps: Some(min_coverage_bps),
        minting_paused: Some(false),
        minting_enabled: Some(true),
        hook_wired: Some(true),
        forwarder_set: Some(true),
        ..EnforcementSnapshot::default()
    }
}

pub fn inputs(
    primary: SourceSlot,
    secondary: SourceSlot,
    snapshot: EnforcementSnapshot,
) -> EvaluationInputs {
    EvaluationInputs {
        primary,
        secondary,
        snapshot,
        incident: None,
    }
}
