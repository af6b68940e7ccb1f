//! Cryptographic error types for `rockpool-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Symmetric encryption failure (AES-256-GCM sealing).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed — ciphertext tampered or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Invalid key material (too short for a 256-bit key).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}
