use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 100% coverage in basis points.
pub const FULL_COVERAGE_BPS: u64 = 10_000;

/// Inputs for one coverage evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageInput {
    /// Reserve value selected by consensus (`None` when nothing was usable).
    pub resolved_reserve_usd: Option<Decimal>,
    /// Outstanding liability supply (whole-token units).
    pub liability_supply: Option<Decimal>,
    /// Coverage as last reported on-chain; used when it cannot be computed.
    pub onchain_coverage_bps: Option<u64>,
    /// Policy override; supersedes the on-chain minimum.
    pub min_coverage_bps_override: Option<u64>,
    pub onchain_min_coverage_bps: Option<u64>,
}

/// Where the reported coverage figure came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageSource {
    /// Computed from the resolved reserve and liability supply.
    Computed,
    /// Taken from the on-chain snapshot.
    Onchain,
    Unknown,
}

/// Where the effective minimum came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimumSource {
    PolicyOverride,
    Onchain,
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageVerdict {
    Covered,
    Breach,
    /// Coverage or minimum is unknown; breach cannot be decided.
    Undetermined,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageOutcome {
    pub coverage_bps: Option<u64>,
    pub coverage_source: CoverageSource,
    pub min_coverage_bps: Option<u64>,
    pub minimum_source: MinimumSource,
    /// Liability supply was zero (vacuously covered).
    pub zero_liability: bool,
    pub verdict: CoverageVerdict,
}

impl CoverageOutcome {
    pub fn breach(&self) -> bool {
        self.verdict == CoverageVerdict::Breach
    }
}
