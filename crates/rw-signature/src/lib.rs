//! rw-signature
//!
//! Reserve reading signature verification.
//!
//! Architectural decisions:
//! - Verification only; key material and signing live outside the engine
//! - Canonical message is versioned (v1 without NAV, v2 with NAV); field order
//!   and separators are a wire contract shared with every signer
//! - EIP-191 personal-message hashing, secp256k1 public key recovery
//! - "Not required" is a distinct verdict from "valid": `valid == None`
//! - Every cryptographic failure is folded into an invalid verdict; nothing
//!   is thrown to the caller
//!
//! Pure deterministic logic. No IO, no clock.

mod address;
mod message;
mod recover;
mod verify;

pub use address::{Address, AddressError};
pub use message::{canonical_message, MessageVersion, SignedFields, MESSAGE_DOMAIN};
pub use recover::{eip191_hash, recover_signer};
pub use verify::{verify, SignatureError, Verification};
