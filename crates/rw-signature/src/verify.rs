use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{canonical_message, recover_signer, Address, SignedFields};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a signature check did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// A signer is expected but the reading carries no signature.
    MissingSignature,
    /// A signer is expected but the reading does not declare one.
    MissingSigner,
    /// The configured expected signer is not a valid address.
    BadExpectedSigner(String),
    /// The declared signer is not a valid address.
    BadDeclaredSigner(String),
    /// Signature bytes are not a well-formed 65-byte secp256k1 signature.
    MalformedSignature(String),
    /// Trailing `v` byte is outside `{0, 1, 27, 28}`.
    InvalidRecoveryId(u8),
    /// Public key recovery failed.
    RecoveryFailed(String),
    /// Recovery succeeded but the address matches neither or only one of the
    /// declared and expected signers.
    SignerMismatch {
        recovered: Address,
        declared: Address,
        expected: Address,
    },
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::MissingSignature => write!(f, "signature required but missing"),
            SignatureError::MissingSigner => write!(f, "signer required but missing"),
            SignatureError::BadExpectedSigner(e) => write!(f, "expected signer invalid: {e}"),
            SignatureError::BadDeclaredSigner(e) => write!(f, "declared signer invalid: {e}"),
            SignatureError::MalformedSignature(e) => write!(f, "malformed signature: {e}"),
            SignatureError::InvalidRecoveryId(v) => write!(f, "invalid recovery id v={v}"),
            SignatureError::RecoveryFailed(e) => write!(f, "signer recovery failed: {e}"),
            SignatureError::SignerMismatch {
                recovered,
                declared,
                expected,
            } => write!(
                f,
                "signer mismatch: recovered={recovered} declared={declared} expected={expected}"
            ),
        }
    }
}

impl std::error::Error for SignatureError {}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of [`verify`].
///
/// `valid` is tri-state:
/// - `None`       : no signer expected; signature was not evaluated
/// - `Some(true)` : recovered signer equals both the declared and expected signer
/// - `Some(false)`: a signer is expected and the check failed (fail-closed)
///
/// Callers must never treat `None` as verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub valid: Option<bool>,
    pub recovered_signer: Option<Address>,
    pub error: Option<String>,
}

impl Verification {
    pub fn not_required() -> Self {
        Self {
            valid: None,
            recovered_signer: None,
            error: None,
        }
    }

    fn passed(recovered: Address) -> Self {
        Self {
            valid: Some(true),
            recovered_signer: Some(recovered),
            error: None,
        }
    }

    fn failed(recovered: Option<Address>, err: SignatureError) -> Self {
        Self {
            valid: Some(false),
            recovered_signer: recovered,
            error: Some(err.to_string()),
        }
    }

    /// `true` only for an explicit failed check.
    pub fn is_invalid(&self) -> bool {
        self.valid == Some(false)
    }
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

/// Verify a reading's signature against `expected_signer`.
///
/// An empty or absent `expected_signer` means verification is not required.
/// Otherwise a missing signature or signer fails closed, and the recovered
/// address must equal **both** the declared signer and the expected signer.
pub fn verify(fields: &SignedFields<'_>, expected_signer: Option<&str>) -> Verification {
    let expected = match expected_signer.map(str::trim).filter(|s| !s.is_empty()) {
        None => return Verification::not_required(),
        Some(raw) => match raw.parse::<Address>() {
            Ok(a) => a,
            Err(e) => {
                return Verification::failed(None, SignatureError::BadExpectedSigner(e.to_string()))
            }
        },
    };

    let Some(signature) = fields.signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return Verification::failed(None, SignatureError::MissingSignature);
    };
    let Some(declared_raw) = fields.signer.map(str::trim).filter(|s| !s.is_empty()) else {
        return Verification::failed(None, SignatureError::MissingSigner);
    };
    let declared = match declared_raw.parse::<Address>() {
        Ok(a) => a,
        Err(e) => {
            return Verification::failed(None, SignatureError::BadDeclaredSigner(e.to_string()))
        }
    };

    let message = canonical_message(fields);
    match recover_signer(&message, signature) {
        Ok(recovered) if recovered == declared && recovered == expected => {
            Verification::passed(recovered)
        }
        Ok(recovered) => Verification::failed(
            Some(recovered),
            SignatureError::SignerMismatch {
                recovered,
                declared,
                expected,
            },
        ),
        Err(e) => Verification::failed(None, e),
    }
}
