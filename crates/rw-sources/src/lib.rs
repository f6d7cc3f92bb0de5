//! rw-sources
//!
//! I/O boundary: reserve source fetches and on-chain enforcement reads.
//!
//! Every failure (timeout, non-2xx, undecodable body, RPC error) is turned
//! into a value here: `FetchOutcome::Failed` for reserve sources and
//! `EnforcementSnapshot::unavailable` for the on-chain read. Nothing past
//! this crate sees a transport error.

mod collect;
mod enforcement;
mod error;
mod reserve;

pub use collect::Sources;
pub use enforcement::{read_with_fallback, BlockTag, EnforcementReader, HttpEnforcementReader};
pub use error::SourceError;
pub use reserve::{fetch_outcome, HttpReserveSource, ReserveSource};
