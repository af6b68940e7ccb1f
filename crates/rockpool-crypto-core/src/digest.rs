//! Single-shot SHA-256 digest engine.
//!
//! Every construction in this crate (credential hashing, fallback keystream)
//! bottoms out here. The digest is plain SHA-256, so any standards-compliant
//! implementation is interchangeable — the unit tests pin the FIPS 180-4
//! vectors to keep it that way.

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

/// Digest output length in bytes (256 bits).
pub const DIGEST_LEN: usize = 32;

/// Compute the SHA-256 digest of an arbitrary byte string.
///
/// Deterministic, pure, no error conditions. Single-shot only — every
/// message in this system is a short string, so no streaming API is needed.
#[must_use]
pub fn digest(message: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.finalize().into()
}

/// SHA-256 of a string's UTF-8 bytes, as 64 lowercase hex characters.
///
/// This is the form the credential hasher composes: hex output feeds back
/// into further digest calls as text.
#[must_use]
pub fn digest_hex(message: &str) -> String {
    HEXLOWER.encode(&digest(message.as_bytes()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
