//! Salted, domain-separated credential hashing.
//!
//! This module provides:
//! - [`hash_pin`] — one-way hash gating app unlock
//! - [`hash_export_password`] — one-way hash gating export authorization
//! - [`verify_pin`] / [`verify_export_password`] — constant-time verification
//!
//! Both hashes are double digests over distinct constant salts with distinct
//! concatenation orders, so a PIN hash can never equal an export-password
//! hash for the same input. The double digest raises the cost of table
//! lookups without pulling in an external KDF.

use subtle::ConstantTimeEq;

use crate::digest::digest_hex;

/// Domain-separation salt for PIN hashing.
pub const PIN_SALT: &str = "rockpool_pin_secure_v1";

/// Domain-separation salt for export-password hashing.
pub const EXPORT_SALT: &str = "rockpool_export_cipher_v1";

/// Hash a PIN for storage: `H(H(salt + pin + salt) + salt)`.
///
/// Empty input is valid and produces a valid (just guessable) hash.
#[must_use]
pub fn hash_pin(pin: &str) -> String {
    let first = digest_hex(&format!("{PIN_SALT}{pin}{PIN_SALT}"));
    digest_hex(&format!("{first}{PIN_SALT}"))
}

/// Hash an export password for storage: `H(H(salt + pw) + salt + pw)`.
///
/// The combination order differs from [`hash_pin`] on top of the distinct
/// salt, keeping the two credential domains separated.
#[must_use]
pub fn hash_export_password(password: &str) -> String {
    let first = digest_hex(&format!("{EXPORT_SALT}{password}"));
    digest_hex(&format!("{first}{EXPORT_SALT}{password}"))
}

/// Verify a PIN against a stored hash in constant time.
#[must_use]
pub fn verify_pin(pin: &str, stored_hash: &str) -> bool {
    constant_time_str_eq(&hash_pin(pin), stored_hash)
}

/// Verify an export password against a stored hash in constant time.
#[must_use]
pub fn verify_export_password(password: &str, stored_hash: &str) -> bool {
    constant_time_str_eq(&hash_export_password(password), stored_hash)
}

/// Constant-time string comparison.
///
/// A length mismatch returns `false` immediately — hash lengths are public
/// information (always 64 hex chars), only the contents are compared in
/// constant time.
fn constant_time_str_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
