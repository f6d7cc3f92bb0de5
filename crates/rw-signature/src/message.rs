//! Canonical signed-message encoding.
//!
//! v1: `ReserveWatch:v1|source=<id>|reserveUsd=<reserve>|timestamp=<ts>`
//! v2: `ReserveWatch:v2|source=<id>|reserveUsd=<reserve>|navUsd=<nav>|timestamp=<ts>`
//!
//! Amounts are embedded exactly as the source reported them (their textual
//! form), never re-rendered from a parsed number: `1200000` and `1200000.0`
//! are different messages.

/// Fixed prefix shared by every message version.
pub const MESSAGE_DOMAIN: &str = "ReserveWatch";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageVersion {
    V1,
    V2,
}

impl MessageVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageVersion::V1 => "v1",
            MessageVersion::V2 => "v2",
        }
    }
}

/// The reading fields a signature covers, plus the signer claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignedFields<'a> {
    pub source_id: &'a str,
    pub reserve_usd: &'a str,
    pub nav_usd: Option<&'a str>,
    pub timestamp_unix_s: i64,
    /// Declared signer (as reported by the source).
    pub signer: Option<&'a str>,
    /// Hex-encoded 65-byte signature.
    pub signature: Option<&'a str>,
}

impl SignedFields<'_> {
    /// NAV presence selects v2.
    pub fn version(&self) -> MessageVersion {
        if self.nav_usd.is_some() {
            MessageVersion::V2
        } else {
            MessageVersion::V1
        }
    }
}

pub fn canonical_message(fields: &SignedFields<'_>) -> String {
    let version = fields.version().as_str();
    match fields.nav_usd {
        None => format!(
            "{MESSAGE_DOMAIN}:{version}|source={}|reserveUsd={}|timestamp={}",
            fields.source_id, fields.reserve_usd, fields.timestamp_unix_s
        ),
        Some(nav) => format!(
            "{MESSAGE_DOMAIN}:{version}|source={}|reserveUsd={}|navUsd={}|timestamp={}",
            fields.source_id, fields.reserve_usd, nav, fields.timestamp_unix_s
        ),
    }
}
