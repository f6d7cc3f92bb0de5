//! rw-coverage
//!
//! Reserve coverage vs. minimum coverage threshold.
//!
//! Architectural decisions:
//! - Coverage is basis points, floored: `floor(reserve * 10_000 / supply)`
//! - Zero liability supply never divides; it reports 0 bps and is not a breach
//! - Effective minimum: policy override, else on-chain minimum, else unknown
//! - "No known minimum" is its own verdict, never an implicit floor of 0
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{coverage_bps, evaluate};
pub use types::*;
