//! Secret-literal scan over the merged config tree.
//!
//! Attestation signing keys and RPC provider credentials reach the monitor
//! through the environment. A config leaf shaped like one aborts the load,
//! and the error names the leaf and its kind but never echoes the value.

use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SecretKind {
    /// Raw 32-byte secp256k1 scalar (`0x` optional). Signer addresses are
    /// 20 bytes and never match.
    SigningKey,
    /// PEM-armoured private key block.
    PemKey,
    /// RPC provider, cloud or CI credential recognised by its prefix.
    ProviderToken,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::SigningKey => "signing_key",
            SecretKind::PemKey => "pem_key",
            SecretKind::ProviderToken => "provider_token",
        }
    }
}

const TOKEN_PREFIXES: &[&str] = &[
    "sk-", "sk_live", "sk_test", "AKIA", "ghp_", "gho_", "glpat-", "xoxb-", "xoxp-",
];

/// Short strings are never treated as secrets.
const MIN_SECRET_LEN: usize = 8;

pub fn classify(raw: &str) -> Option<SecretKind> {
    let t = raw.trim();
    if t.len() < MIN_SECRET_LEN {
        return None;
    }
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    if digits.len() == 64 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(SecretKind::SigningKey)
    } else if t.starts_with("-----BEGIN") {
        Some(SecretKind::PemKey)
    } else if TOKEN_PREFIXES.iter().any(|p| t.starts_with(p)) {
        Some(SecretKind::ProviderToken)
    } else {
        None
    }
}

/// First secret-shaped string leaf in key order, as a JSON pointer.
pub fn find_secret(root: &Value) -> Option<(String, SecretKind)> {
    let mut pending: Vec<(String, &Value)> = vec![(String::new(), root)];
    while let Some((ptr, node)) = pending.pop() {
        match node {
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    let token = key.replace('~', "~0").replace('/', "~1");
                    pending.push((format!("{ptr}/{token}"), child));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate().rev() {
                    pending.push((format!("{ptr}/{i}"), child));
                }
            }
            Value::String(s) => {
                if let Some(kind) = classify(s) {
                    let ptr = if ptr.is_empty() { "/".to_string() } else { ptr };
                    return Some((ptr, kind));
                }
            }
            _ => {}
        }
    }
    None
}
