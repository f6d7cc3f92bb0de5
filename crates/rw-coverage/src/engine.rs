use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{
    CoverageInput, CoverageOutcome, CoverageSource, CoverageVerdict, MinimumSource,
    FULL_COVERAGE_BPS,
};

/// `floor(reserve * 10_000 / supply)`, or 0 when `supply` is zero.
///
/// Negative inputs (never produced by validated readings) clamp to 0.
/// Results beyond `u64` saturate.
pub fn coverage_bps(reserve_usd: Decimal, liability_supply: Decimal) -> u64 {
    if liability_supply <= Decimal::ZERO || reserve_usd <= Decimal::ZERO {
        return 0;
    }
    let scale = Decimal::from(FULL_COVERAGE_BPS);
    // Multiply first for precision; divide first if that would overflow.
    let bps = match reserve_usd.checked_mul(scale) {
        Some(scaled) => scaled.checked_div(liability_supply),
        None => reserve_usd
            .checked_div(liability_supply)
            .and_then(|r| r.checked_mul(scale)),
    };
    match bps {
        Some(v) => v.floor().to_u64().unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

/// Evaluate coverage against the effective minimum.
pub fn evaluate(input: &CoverageInput) -> CoverageOutcome {
    let zero_liability = input
        .liability_supply
        .is_some_and(|s| s.is_zero());

    let (coverage_bps, coverage_source) =
        match (input.resolved_reserve_usd, input.liability_supply) {
            (Some(reserve), Some(supply)) => {
                (Some(coverage_bps(reserve, supply)), CoverageSource::Computed)
            }
            _ => match input.onchain_coverage_bps {
                Some(bps) => (Some(bps), CoverageSource::Onchain),
                None => (None, CoverageSource::Unknown),
            },
        };

    let (min_coverage_bps, minimum_source) =
        match (input.min_coverage_bps_override, input.onchain_min_coverage_bps) {
            (Some(m), _) => (Some(m), MinimumSource::PolicyOverride),
            (None, Some(m)) => (Some(m), MinimumSource::Onchain),
            (None, None) => (None, MinimumSource::Unknown),
        };

    let verdict = match (coverage_bps, min_coverage_bps) {
        _ if zero_liability && coverage_source == CoverageSource::Computed => {
            CoverageVerdict::Covered
        }
        (Some(c), Some(m)) if c < m => CoverageVerdict::Breach,
        (Some(_), Some(_)) => CoverageVerdict::Covered,
        _ => CoverageVerdict::Undetermined,
    };

    CoverageOutcome {
        coverage_bps,
        coverage_source,
        min_coverage_bps,
        minimum_source,
        zero_liability,
        verdict,
    }
}
