//! rw-engine
//!
//! The single evaluation entry point:
//! fetched payloads + on-chain snapshot + policy + incident -> `DerivedStatus`.
//!
//! Architectural decisions:
//! - Pipeline order is fixed: validate -> verify -> resolve -> coverage -> derive
//! - Transport and validation failures flow in as values, never as errors
//! - The only error is a configuration error (bad policy), which fails loudly
//! - Enforcement transition detection compares against an explicit `previous`
//!   snapshot supplied by the caller; the engine keeps no state
//! - Attestation values are derived from a finished evaluation, not recomputed
//!
//! Deterministic, pure logic. No IO, no wall-clock: callers pass `now`.

mod attestation;
mod pipeline;
mod transitions;

pub use attestation::{attestation_for, Attestation, AttestationBlocked};
pub use pipeline::{
    evaluate, evaluate_with_policy, source_input, EngineError, EvaluationInputs, SourceSlot,
};
pub use transitions::{detect_transitions, EnforcementTransition};
