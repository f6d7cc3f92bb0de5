//! Consensus policy (immutable per evaluation).
//!
//! [`PolicySpec`] is the loose, deserialisable shape (config files, preview
//! requests). [`PolicySpec::validate`] is the only way to obtain a
//! [`ConsensusPolicy`]; malformed or unknown values are configuration errors
//! and are never replaced by defaults.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESERVE_AGE_S: f64 = 120.0;
pub const DEFAULT_MAX_MISMATCH_RATIO: f64 = 0.01;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMode {
    PrimaryOnly,
    RequireMatch,
    ConservativeMin,
}

impl ConsensusMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMode::PrimaryOnly => "primary_only",
            ConsensusMode::RequireMatch => "require_match",
            ConsensusMode::ConservativeMin => "conservative_min",
        }
    }
}

impl FromStr for ConsensusMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "primary_only" => Ok(ConsensusMode::PrimaryOnly),
            "require_match" => Ok(ConsensusMode::RequireMatch),
            "conservative_min" => Ok(ConsensusMode::ConservativeMin),
            other => Err(PolicyError::UnknownMode(other.to_string())),
        }
    }
}

/// What to do when the primary reading is unusable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Use the secondary reading if it is usable.
    #[default]
    FallbackSecondary,
    /// No fallback away from the primary.
    FailClosed,
}

impl FromStr for StalePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fallback_secondary" => Ok(StalePolicy::FallbackSecondary),
            "fail_closed" => Ok(StalePolicy::FailClosed),
            other => Err(PolicyError::UnknownStalePolicy(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    UnknownMode(String),
    UnknownStalePolicy(String),
    /// `max_reserve_age_s` must be finite and > 0.
    BadMaxReserveAge(f64),
    /// `max_mismatch_ratio` must be finite and >= 0.
    BadMaxMismatchRatio(f64),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::UnknownMode(m) => write!(
                f,
                "unknown consensus mode '{m}'. expected one of: \
                 primary_only | require_match | conservative_min"
            ),
            PolicyError::UnknownStalePolicy(p) => write!(
                f,
                "unknown stale policy '{p}'. expected one of: fallback_secondary | fail_closed"
            ),
            PolicyError::BadMaxReserveAge(v) => {
                write!(f, "max_reserve_age_s must be a positive number, got {v}")
            }
            PolicyError::BadMaxMismatchRatio(v) => {
                write!(f, "max_mismatch_ratio must be a non-negative number, got {v}")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

// ---------------------------------------------------------------------------
// PolicySpec (raw) -> ConsensusPolicy (validated)
// ---------------------------------------------------------------------------

/// Deserialisable policy as written by an operator.
///
/// `mode` and `stale_policy` are plain strings so that an unknown value
/// surfaces as a [`PolicyError`] naming the accepted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySpec {
    pub mode: String,
    #[serde(default = "default_max_reserve_age_s")]
    pub max_reserve_age_s: f64,
    #[serde(default = "default_max_mismatch_ratio")]
    pub max_mismatch_ratio: f64,
    #[serde(default)]
    pub stale_policy: Option<String>,
    /// Supersedes the on-chain minimum when set.
    #[serde(default)]
    pub min_coverage_bps: Option<u64>,
}

fn default_max_reserve_age_s() -> f64 {
    DEFAULT_MAX_RESERVE_AGE_S
}

fn default_max_mismatch_ratio() -> f64 {
    DEFAULT_MAX_MISMATCH_RATIO
}

impl PolicySpec {
    pub fn new(mode: ConsensusMode) -> Self {
        Self {
            mode: mode.as_str().to_string(),
            max_reserve_age_s: DEFAULT_MAX_RESERVE_AGE_S,
            max_mismatch_ratio: DEFAULT_MAX_MISMATCH_RATIO,
            stale_policy: None,
            min_coverage_bps: None,
        }
    }

    pub fn validate(&self) -> Result<ConsensusPolicy, PolicyError> {
        let mode = ConsensusMode::from_str(&self.mode)?;
        let stale_policy = match self.stale_policy.as_deref() {
            None => StalePolicy::default(),
            Some(s) => StalePolicy::from_str(s)?,
        };

        if !self.max_reserve_age_s.is_finite() || self.max_reserve_age_s <= 0.0 {
            return Err(PolicyError::BadMaxReserveAge(self.max_reserve_age_s));
        }
        if !self.max_mismatch_ratio.is_finite() || self.max_mismatch_ratio < 0.0 {
            return Err(PolicyError::BadMaxMismatchRatio(self.max_mismatch_ratio));
        }
        let max_mismatch_ratio = Decimal::try_from(self.max_mismatch_ratio)
            .map_err(|_| PolicyError::BadMaxMismatchRatio(self.max_mismatch_ratio))?;

        Ok(ConsensusPolicy {
            mode,
            max_reserve_age_s: self.max_reserve_age_s,
            max_mismatch_ratio,
            stale_policy,
            min_coverage_bps: self.min_coverage_bps,
        })
    }
}

/// Validated consensus policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusPolicy {
    pub mode: ConsensusMode,
    pub max_reserve_age_s: f64,
    #[serde(with = "rust_decimal::serde::str")]
    pub max_mismatch_ratio: Decimal,
    pub stale_policy: StalePolicy,
    pub min_coverage_bps: Option<u64>,
}

impl ConsensusPolicy {
    /// Defaults for everything but the mode.
    pub fn with_mode(mode: ConsensusMode) -> Self {
        Self {
            mode,
            max_reserve_age_s: DEFAULT_MAX_RESERVE_AGE_S,
            max_mismatch_ratio: Decimal::new(1, 2),
            stale_policy: StalePolicy::default(),
            min_coverage_bps: None,
        }
    }

    /// A reading of this age (seconds) is still fresh.
    pub fn is_fresh(&self, age_s: i64) -> bool {
        (age_s as f64) <= self.max_reserve_age_s
    }
}
