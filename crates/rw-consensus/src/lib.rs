//! rw-consensus
//!
//! Reserve reading validation and two-source consensus.
//!
//! Architectural decisions:
//! - Validation and signature verification are separate stages; an unsigned
//!   but well-formed reading is usable when no signer is expected
//! - A reading is usable only if present, well-formed, not signature-invalid,
//!   and no older than `max_reserve_age_s`
//! - `require_match` never falls back: both sources must be usable
//! - `conservative_min` always selects the lower of two usable reserves
//! - Mismatch is a separate signal; it never removes the selected reading
//! - "now" is supplied by the caller once per evaluation
//!
//! Deterministic, pure logic. No IO, no wall-clock.

mod policy;
mod reading;
mod resolver;

pub use policy::{ConsensusMode, ConsensusPolicy, PolicyError, PolicySpec, StalePolicy};
pub use reading::{parse_reading, ReadingError, ReserveReading, UsdAmount};
pub use resolver::{
    mismatch_ratio, resolve, ResolveOutcome, SelectedReading, SourceAssessment, SourceInput,
    SourceRole, SourceState,
};
