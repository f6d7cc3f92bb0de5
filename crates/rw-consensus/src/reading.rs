//! Reading validation: raw payload -> [`ReserveReading`].
//!
//! Amounts keep their original textual form alongside the parsed decimal:
//! the text is what the source signed, the decimal is what the engine
//! computes with.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rw_schemas::RawReservePayload;
use rw_signature::SignedFields;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A non-negative USD amount with its source text preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsdAmount {
    /// Exactly as reported (JSON string verbatim, or the rendered JSON number).
    pub text: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

impl UsdAmount {
    pub fn parse(raw: &Value, field: &'static str) -> Result<Self, ReadingError> {
        let text = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => render_number(n),
            other => {
                return Err(ReadingError::InvalidAmount {
                    field,
                    raw: other.to_string(),
                })
            }
        };
        if text.trim().is_empty() {
            return Err(ReadingError::MissingField { field });
        }
        let value = Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| ReadingError::InvalidAmount {
                field,
                raw: text.clone(),
            })?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ReadingError::NegativeAmount { field, raw: text });
        }
        Ok(Self { text, value })
    }
}

/// Integers render without a fractional part; other floats use the shortest
/// round-trip form.
fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingError {
    MissingField { field: &'static str },
    InvalidTimestamp { raw: String },
    NonFiniteTimestamp { raw: String },
    /// Timestamps are whole seconds; the canonical message embeds them as integers.
    FractionalTimestamp { raw: String },
    InvalidAmount { field: &'static str, raw: String },
    NegativeAmount { field: &'static str, raw: String },
    /// `source` was present but empty, or no connector id was available.
    EmptySource,
    InvalidSource { raw: String },
}

impl fmt::Display for ReadingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingError::MissingField { field } => write!(f, "missing required field '{field}'"),
            ReadingError::InvalidTimestamp { raw } => {
                write!(f, "timestamp is not numeric: '{raw}'")
            }
            ReadingError::NonFiniteTimestamp { raw } => {
                write!(f, "timestamp is not finite: '{raw}'")
            }
            ReadingError::FractionalTimestamp { raw } => {
                write!(f, "timestamp must be whole seconds: '{raw}'")
            }
            ReadingError::InvalidAmount { field, raw } => {
                write!(f, "field '{field}' is not a decimal amount: '{raw}'")
            }
            ReadingError::NegativeAmount { field, raw } => {
                write!(f, "field '{field}' must be >= 0, got '{raw}'")
            }
            ReadingError::EmptySource => write!(f, "source must not be empty"),
            ReadingError::InvalidSource { raw } => write!(f, "source must be a string: {raw}"),
        }
    }
}

impl std::error::Error for ReadingError {}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One source's validated measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveReading {
    pub timestamp_unix_s: i64,
    pub reserve_usd: UsdAmount,
    pub nav_usd: Option<UsdAmount>,
    pub source_id: String,
    pub signer: Option<String>,
    pub signature: Option<String>,
}

impl ReserveReading {
    /// Seconds elapsed since the reading was taken. Negative for future-dated readings.
    pub fn age_s(&self, now_unix_s: i64) -> i64 {
        now_unix_s.saturating_sub(self.timestamp_unix_s)
    }

    pub fn signed_fields(&self) -> SignedFields<'_> {
        SignedFields {
            source_id: &self.source_id,
            reserve_usd: &self.reserve_usd.text,
            nav_usd: self.nav_usd.as_ref().map(|n| n.text.as_str()),
            timestamp_unix_s: self.timestamp_unix_s,
            signer: self.signer.as_deref(),
            signature: self.signature.as_deref(),
        }
    }
}

/// Validate a raw payload.
///
/// `default_source` is the connector's configured id, used when the payload
/// omits `source`.
pub fn parse_reading(
    raw: &RawReservePayload,
    default_source: &str,
) -> Result<ReserveReading, ReadingError> {
    let timestamp_unix_s = parse_timestamp(raw.timestamp.as_ref())?;

    let reserve_usd = match raw.reserve_usd.as_ref() {
        None | Some(Value::Null) => {
            return Err(ReadingError::MissingField {
                field: "reserveUsd",
            })
        }
        Some(v) => UsdAmount::parse(v, "reserveUsd")?,
    };

    let nav_usd = match raw.nav_usd.as_ref() {
        None | Some(Value::Null) => None,
        Some(v) => Some(UsdAmount::parse(v, "navUsd")?),
    };

    let source_id = match raw.source.as_ref() {
        None | Some(Value::Null) => default_source.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(ReadingError::InvalidSource {
                raw: other.to_string(),
            })
        }
    };
    if source_id.trim().is_empty() {
        return Err(ReadingError::EmptySource);
    }

    Ok(ReserveReading {
        timestamp_unix_s,
        reserve_usd,
        nav_usd,
        source_id,
        signer: raw.signer.clone(),
        signature: raw.signature.clone(),
    })
}

fn parse_timestamp(raw: Option<&Value>) -> Result<i64, ReadingError> {
    let missing = ReadingError::MissingField { field: "timestamp" };
    match raw {
        None | Some(Value::Null) => Err(missing),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) => float_to_secs(f, &n.to_string()),
                None => Err(ReadingError::InvalidTimestamp { raw: n.to_string() }),
            }
        }
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Err(missing);
            }
            if let Ok(i) = t.parse::<i64>() {
                return Ok(i);
            }
            match t.parse::<f64>() {
                Ok(f) => float_to_secs(f, t),
                Err(_) => Err(ReadingError::InvalidTimestamp { raw: t.to_string() }),
            }
        }
        Some(other) => Err(ReadingError::InvalidTimestamp {
            raw: other.to_string(),
        }),
    }
}

fn float_to_secs(f: f64, raw: &str) -> Result<i64, ReadingError> {
    if !f.is_finite() {
        return Err(ReadingError::NonFiniteTimestamp {
            raw: raw.to_string(),
        });
    }
    if f.fract() != 0.0 {
        return Err(ReadingError::FractionalTimestamp {
            raw: raw.to_string(),
        });
    }
    if f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(ReadingError::InvalidTimestamp {
            raw: raw.to_string(),
        });
    }
    Ok(f as i64)
}
