//! Two-source consensus resolution.
//!
//! | mode               | both usable                 | one usable                   | none  |
//! |--------------------|-----------------------------|------------------------------|-------|
//! | `primary_only`     | primary                     | primary, else secondary*     | stale |
//! | `require_match`    | primary (+ mismatch check)  | stale                        | stale |
//! | `conservative_min` | lower reserve (+ mismatch)  | primary, else secondary*     | stale |
//!
//! `*` only under [`StalePolicy::FallbackSecondary`].

use rust_decimal::Decimal;
use rw_signature::Verification;
use serde::{Deserialize, Serialize};

use crate::{ConsensusMode, ConsensusPolicy, ReserveReading, StalePolicy};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Primary,
    Secondary,
}

/// One source slot after fetch, validation and signature verification.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceInput {
    /// No connector configured in this slot.
    NotConfigured,
    /// Transport failure (timeout, non-2xx, undecodable body).
    Unavailable { error: String },
    /// Payload fetched but failed validation.
    Invalid { error: String },
    /// Well-formed reading with its signature verdict.
    Read {
        reading: ReserveReading,
        signature: Verification,
    },
}

// ---------------------------------------------------------------------------
// Per-source assessment
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    NotConfigured,
    Unavailable,
    Invalid,
    SignatureInvalid,
    Stale,
    Usable,
}

/// Diagnostic view of one source for this evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAssessment {
    pub role: SourceRole,
    pub state: SourceState,
    pub source_id: Option<String>,
    pub age_s: Option<i64>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub reserve_usd: Option<Decimal>,
    /// Tri-state signature verdict (`None` = not evaluated).
    pub signature_valid: Option<bool>,
    pub error: Option<String>,
}

impl SourceAssessment {
    fn assess(role: SourceRole, input: &SourceInput, policy: &ConsensusPolicy, now: i64) -> Self {
        let blank = |state: SourceState, error: Option<String>| SourceAssessment {
            role,
            state,
            source_id: None,
            age_s: None,
            reserve_usd: None,
            signature_valid: None,
            error,
        };
        match input {
            SourceInput::NotConfigured => blank(SourceState::NotConfigured, None),
            SourceInput::Unavailable { error } => {
                blank(SourceState::Unavailable, Some(error.clone()))
            }
            SourceInput::Invalid { error } => blank(SourceState::Invalid, Some(error.clone())),
            SourceInput::Read { reading, signature } => {
                let age = reading.age_s(now);
                let state = if signature.is_invalid() {
                    SourceState::SignatureInvalid
                } else if !policy.is_fresh(age) {
                    SourceState::Stale
                } else {
                    SourceState::Usable
                };
                SourceAssessment {
                    role,
                    state,
                    source_id: Some(reading.source_id.clone()),
                    age_s: Some(age),
                    reserve_usd: Some(reading.reserve_usd.value),
                    signature_valid: signature.valid,
                    error: signature.error.clone(),
                }
            }
        }
    }

    pub fn is_usable(&self) -> bool {
        self.state == SourceState::Usable
    }

    pub fn signature_invalid(&self) -> bool {
        self.state == SourceState::SignatureInvalid
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedReading {
    pub role: SourceRole,
    pub reading: ReserveReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub selected: Option<SelectedReading>,
    /// No usable reading could be selected under the policy.
    pub stale: bool,
    /// A reading the mode consulted failed a required signature check.
    pub signature_invalid: bool,
    /// Divergence above `max_mismatch_ratio` (require_match / conservative_min).
    pub mismatch: bool,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub mismatch_ratio: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub mismatch_usd: Option<Decimal>,
    pub primary: SourceAssessment,
    pub secondary: SourceAssessment,
}

impl ResolveOutcome {
    pub fn selected_reserve_usd(&self) -> Option<Decimal> {
        self.selected.as_ref().map(|s| s.reading.reserve_usd.value)
    }
}

// ---------------------------------------------------------------------------
// Mismatch
// ---------------------------------------------------------------------------

/// `|a - b| / max(a, b, 1)`.
///
/// Symmetric in its arguments and zero for equal inputs. The `1` floor keeps
/// the ratio defined when both sides are near zero.
pub fn mismatch_ratio(a: Decimal, b: Decimal) -> Decimal {
    let diff = (a - b).abs();
    let denom = a.max(b).max(Decimal::ONE);
    diff.checked_div(denom).unwrap_or(Decimal::MAX)
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Reconcile primary and secondary under `policy`, at `now_unix_s`.
pub fn resolve(
    primary: &SourceInput,
    secondary: &SourceInput,
    policy: &ConsensusPolicy,
    now_unix_s: i64,
) -> ResolveOutcome {
    let pa = SourceAssessment::assess(SourceRole::Primary, primary, policy, now_unix_s);
    let sa = SourceAssessment::assess(SourceRole::Secondary, secondary, policy, now_unix_s);

    let usable = |input: &SourceInput, a: &SourceAssessment| -> Option<ReserveReading> {
        match input {
            SourceInput::Read { reading, .. } if a.is_usable() => Some(reading.clone()),
            _ => None,
        }
    };
    let p = usable(primary, &pa);
    let s = usable(secondary, &sa);

    let (ratio, diff_usd) = match (&p, &s) {
        (Some(p), Some(s)) => {
            let (a, b) = (p.reserve_usd.value, s.reserve_usd.value);
            (Some(mismatch_ratio(a, b)), Some((a - b).abs()))
        }
        _ => (None, None),
    };
    let above_threshold = ratio.is_some_and(|r| r > policy.max_mismatch_ratio);
    let may_fall_back = policy.stale_policy == StalePolicy::FallbackSecondary;
    // primary_only looks at the secondary only when it falls back to it.
    let secondary_consulted = match policy.mode {
        ConsensusMode::PrimaryOnly => p.is_none() && may_fall_back,
        ConsensusMode::RequireMatch | ConsensusMode::ConservativeMin => true,
    };

    let pick = |role: SourceRole, reading: ReserveReading| SelectedReading { role, reading };

    let (selected, mismatch) = match policy.mode {
        ConsensusMode::PrimaryOnly => {
            let selected = match (p, s) {
                (Some(p), _) => Some(pick(SourceRole::Primary, p)),
                (None, Some(s)) if may_fall_back => Some(pick(SourceRole::Secondary, s)),
                _ => None,
            };
            (selected, false)
        }
        ConsensusMode::RequireMatch => match (p, s) {
            (Some(p), Some(_)) => (Some(pick(SourceRole::Primary, p)), above_threshold),
            _ => (None, false),
        },
        ConsensusMode::ConservativeMin => match (p, s) {
            (Some(p), Some(s)) => {
                let selected = if s.reserve_usd.value < p.reserve_usd.value {
                    pick(SourceRole::Secondary, s)
                } else {
                    pick(SourceRole::Primary, p)
                };
                (Some(selected), above_threshold)
            }
            (Some(p), None) => (Some(pick(SourceRole::Primary, p)), false),
            (None, Some(s)) if may_fall_back => (Some(pick(SourceRole::Secondary, s)), false),
            _ => (None, false),
        },
    };

    ResolveOutcome {
        stale: selected.is_none(),
        signature_invalid: pa.signature_invalid()
            || (secondary_consulted && sa.signature_invalid()),
        selected,
        mismatch,
        mismatch_ratio: ratio,
        mismatch_usd: diff_usd,
        primary: pa,
        secondary: sa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UsdAmount;
    use std::str::FromStr;

    const NOW: i64 = 1_700_000_000;

    fn reading(source: &str, reserve: &str, ts: i64) -> ReserveReading {
        ReserveReading {
            timestamp_unix_s: ts,
            reserve_usd: UsdAmount {
                text: reserve.to_string(),
                value: Decimal::from_str(reserve).unwrap(),
            },
            nav_usd: None,
            source_id: source.to_string(),
            signer: None,
            signature: None,
        }
    }

    fn read(reserve: &str, ts: i64) -> SourceInput {
        SourceInput::Read {
            reading: reading("src", reserve, ts),
            signature: Verification::not_required(),
        }
    }

    fn bad_sig(reserve: &str) -> SourceInput {
        SourceInput::Read {
            reading: reading("src", reserve, NOW),
            signature: Verification {
                valid: Some(false),
                recovered_signer: None,
                error: Some("signature required but missing".to_string()),
            },
        }
    }

    fn policy(mode: ConsensusMode) -> ConsensusPolicy {
        ConsensusPolicy::with_mode(mode)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn mismatch_ratio_is_symmetric_and_zero_on_equal() {
        let pairs = [("1200000", "900000"), ("0", "0.5"), ("3", "7"), ("0", "0")];
        for (a, b) in pairs {
            assert_eq!(mismatch_ratio(d(a), d(b)), mismatch_ratio(d(b), d(a)));
            assert_eq!(mismatch_ratio(d(a), d(a)), Decimal::ZERO);
        }
        assert_eq!(mismatch_ratio(d("1200000"), d("900000")), d("0.25"));
        // Floor of 1 keeps tiny values bounded.
        assert_eq!(mismatch_ratio(d("0"), d("0.5")), d("0.5"));
    }

    #[test]
    fn primary_only_prefers_fresh_primary() {
        let out = resolve(
            &read("100", NOW),
            &read("50", NOW),
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        let sel = out.selected.unwrap();
        assert_eq!(sel.role, SourceRole::Primary);
        assert!(!out.stale);
        assert!(!out.mismatch, "primary_only reports ratio but never flags mismatch");
        assert_eq!(out.mismatch_ratio, Some(d("0.5")));
    }

    #[test]
    fn primary_only_falls_back_to_secondary_when_primary_stale() {
        let out = resolve(
            &read("100", NOW - 500),
            &read("99", NOW),
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        assert_eq!(out.selected.unwrap().role, SourceRole::Secondary);
        assert!(!out.stale);
        assert_eq!(out.primary.state, SourceState::Stale);
        assert_eq!(out.mismatch_ratio, None);
    }

    #[test]
    fn primary_only_fail_closed_does_not_fall_back() {
        let mut p = policy(ConsensusMode::PrimaryOnly);
        p.stale_policy = StalePolicy::FailClosed;
        let out = resolve(&read("100", NOW - 500), &read("99", NOW), &p, NOW);
        assert!(out.selected.is_none());
        assert!(out.stale);
    }

    #[test]
    fn primary_only_both_failed_is_stale() {
        let out = resolve(
            &SourceInput::Unavailable {
                error: "timeout".into(),
            },
            &SourceInput::NotConfigured,
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        assert!(out.stale);
        assert!(out.selected.is_none());
        assert_eq!(out.primary.state, SourceState::Unavailable);
        assert_eq!(out.secondary.state, SourceState::NotConfigured);
    }

    #[test]
    fn signature_invalid_primary_is_not_usable() {
        let out = resolve(
            &bad_sig("100"),
            &read("99", NOW),
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        assert!(out.signature_invalid);
        assert_eq!(out.selected.unwrap().role, SourceRole::Secondary);
    }

    #[test]
    fn primary_only_ignores_bad_secondary_signature_when_primary_is_usable() {
        let out = resolve(
            &read("100", NOW),
            &bad_sig("99"),
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        assert!(!out.signature_invalid);
        assert!(!out.stale);
        assert_eq!(out.selected.unwrap().role, SourceRole::Primary);
        assert_eq!(out.secondary.state, SourceState::SignatureInvalid);
    }

    #[test]
    fn primary_only_flags_bad_secondary_signature_when_falling_back() {
        let out = resolve(
            &read("100", NOW - 3_600),
            &bad_sig("99"),
            &policy(ConsensusMode::PrimaryOnly),
            NOW,
        );
        assert!(out.signature_invalid);
        assert!(out.stale);
    }

    #[test]
    fn require_match_flags_bad_secondary_signature() {
        let out = resolve(
            &read("100", NOW),
            &bad_sig("100"),
            &policy(ConsensusMode::RequireMatch),
            NOW,
        );
        assert!(out.signature_invalid);
        assert!(out.stale);
    }

    #[test]
    fn require_match_within_threshold_selects_primary() {
        let out = resolve(
            &read("1200000", NOW),
            &read("1195000", NOW),
            &policy(ConsensusMode::RequireMatch),
            NOW,
        );
        assert!(!out.stale);
        assert!(!out.mismatch);
        assert_eq!(out.selected.unwrap().role, SourceRole::Primary);
        assert_eq!(out.mismatch_usd, Some(d("5000")));
    }

    #[test]
    fn require_match_mismatch_keeps_selection() {
        let out = resolve(
            &read("1200000", NOW),
            &read("900000", NOW),
            &policy(ConsensusMode::RequireMatch),
            NOW,
        );
        assert!(out.mismatch);
        assert!(!out.stale);
        assert_eq!(out.selected_reserve_usd(), Some(d("1200000")));
    }

    #[test]
    fn require_match_either_stale_means_no_selection() {
        let p = policy(ConsensusMode::RequireMatch);
        for (a, b) in [(NOW - 500, NOW), (NOW, NOW - 500), (NOW - 500, NOW - 500)] {
            let out = resolve(&read("100", a), &read("100", b), &p, NOW);
            assert!(out.stale);
            assert!(out.selected.is_none());
            assert!(!out.mismatch);
        }
    }

    #[test]
    fn require_match_needs_secondary_configured() {
        let out = resolve(
            &read("100", NOW),
            &SourceInput::NotConfigured,
            &policy(ConsensusMode::RequireMatch),
            NOW,
        );
        assert!(out.stale);
    }

    #[test]
    fn conservative_min_selects_lower_reserve() {
        let p = policy(ConsensusMode::ConservativeMin);
        let out = resolve(&read("1000", NOW), &read("990", NOW), &p, NOW);
        assert_eq!(out.selected_reserve_usd(), Some(d("990")));
        assert_eq!(out.selected.unwrap().role, SourceRole::Secondary);
        // Exactly at the 1% threshold is not a mismatch.
        assert!(!out.mismatch);
    }

    #[test]
    fn conservative_min_flags_mismatch_without_failing() {
        let p = policy(ConsensusMode::ConservativeMin);
        let out = resolve(&read("1000", NOW), &read("500", NOW), &p, NOW);
        assert!(out.mismatch);
        assert!(!out.stale);
        assert_eq!(out.selected_reserve_usd(), Some(d("500")));
    }

    #[test]
    fn conservative_min_single_usable_falls_back() {
        let p = policy(ConsensusMode::ConservativeMin);
        let out = resolve(
            &SourceInput::Invalid {
                error: "missing timestamp".into(),
            },
            &read("500", NOW),
            &p,
            NOW,
        );
        assert_eq!(out.selected.unwrap().role, SourceRole::Secondary);

        let mut fc = p.clone();
        fc.stale_policy = StalePolicy::FailClosed;
        let out = resolve(
            &SourceInput::Invalid {
                error: "missing timestamp".into(),
            },
            &read("500", NOW),
            &fc,
            NOW,
        );
        assert!(out.stale);

        let out = resolve(&read("700", NOW), &SourceInput::NotConfigured, &fc, NOW);
        assert_eq!(out.selected_reserve_usd(), Some(d("700")));
    }
}
