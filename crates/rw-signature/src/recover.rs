//! EIP-191 hashing and secp256k1 signer recovery.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::{Address, SignatureError};

/// keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Recover the address that produced `signature_hex` over `message`.
///
/// Accepts a 65-byte `r || s || v` signature, `0x`-prefixed or bare hex, with
/// `v` in `{0, 1, 27, 28}`. High-S signatures are normalised (flipping the
/// recovery parity) before recovery.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, SignatureError> {
    let t = signature_hex.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    let bytes = hex::decode(digits)
        .map_err(|e| SignatureError::MalformedSignature(format!("not hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(SignatureError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = bytes[64];
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let mut recid = RecoveryId::from_byte(parity).ok_or(SignatureError::InvalidRecoveryId(v))?;

    let mut sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let prehash = eip191_hash(message);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recid)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;
    Ok(Address::from_verifying_key(&key))
}
