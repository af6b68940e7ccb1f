//! `rockpool-crypto-core` — Pure cryptographic primitives for Rockpool.
//!
//! This crate is the audit target: zero network, zero async, zero UI
//! dependencies. It covers the three primitives under the account protocol —
//! the SHA-256 digest engine, the salted credential hasher, and the two-path
//! export cipher (AES-256-GCM preferred, digest-keyed stream fallback).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod cipher;
pub mod credential;
pub mod digest;
pub mod error;

pub use cipher::{decrypt, encrypt, encrypt_aead, encrypt_fallback, AEAD_PREFIX, FALLBACK_PREFIX};
pub use credential::{
    hash_export_password, hash_pin, verify_export_password, verify_pin, EXPORT_SALT, PIN_SALT,
};
pub use digest::{digest, digest_hex, DIGEST_LEN};
pub use error::CryptoError;
