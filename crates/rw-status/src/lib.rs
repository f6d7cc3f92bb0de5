//! rw-status
//!
//! Folds every independent failure signal into one ordered system status.
//!
//! Architectural decisions:
//! - Reason codes are collected exhaustively (never first-match) into a set
//! - Status is a strict priority over that set: STALE > DEGRADED > UNHEALTHY > HEALTHY
//! - "Cannot trust the data" always outranks "the data looks bad"
//! - On-chain flags are only judged on an explicit value from an available snapshot
//! - A `DerivedStatus` is built fresh per evaluation and never mutated in place
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{classify, derive, reasons_for};
pub use types::*;
