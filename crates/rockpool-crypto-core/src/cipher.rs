//! Two-path text cipher for export bundles.
//!
//! This module provides:
//! - [`encrypt`] — AES-256-GCM when sealing succeeds, stream-cipher fallback otherwise
//! - [`encrypt_fallback`] — the digest-keyed counter-mode stream cipher, directly
//! - [`decrypt`] — prefix-dispatched decryption, `None` as the single failure signal
//!
//! # Container formats
//!
//! - `"v2:" + hex(nonce96) + ":" + hex(ciphertext || tag)` — authenticated
//! - `"v2-js:" + hex(nonce128) + ":" + utf16-hex ciphertext` — fallback
//!
//! Key material is always the output of
//! [`hash_export_password`](crate::credential::hash_export_password); this
//! module never derives a key from a raw password, which keeps derivation and
//! encryption independently testable.
//!
//! # Integrity
//!
//! Only the `v2:` format is authenticated. The `v2-js:` fallback provides
//! confidentiality only: a tampered ciphertext decrypts to garbage rather
//! than failing closed. Callers must not treat a successful `v2-js:` decrypt
//! as proof the data is intact.

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::Zeroize;

use crate::digest;
use crate::error::CryptoError;

/// Container prefix of the authenticated (AES-256-GCM) format.
pub const AEAD_PREFIX: &str = "v2:";

/// Container prefix of the unauthenticated stream-cipher fallback format.
pub const FALLBACK_PREFIX: &str = "v2-js:";

/// AES-256-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

/// Fallback nonce length in bytes (128 bits).
const FALLBACK_NONCE_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
const KEY_LEN: usize = 32;

/// Keystream window length — one digest output masks 32 code units.
const WINDOW_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Encrypt plaintext under derived key material.
///
/// Prefers the authenticated `v2:` format; if sealing fails (e.g. the key
/// material is shorter than 32 bytes), silently falls back to the
/// unauthenticated `v2-js:` stream cipher, mirroring the two-path design of
/// the wire format.
#[must_use]
pub fn encrypt(plaintext: &str, key_material: &str) -> String {
    encrypt_aead(plaintext, key_material)
        .unwrap_or_else(|_| encrypt_fallback(plaintext, key_material))
}

/// Encrypt with AES-256-GCM only, without falling back.
///
/// The 256-bit key is the first 32 bytes of `key_material`'s UTF-8 encoding;
/// a fresh random 96-bit nonce is generated per call.
///
/// # Errors
///
/// - [`CryptoError::InvalidKeyMaterial`] if `key_material` is shorter than 32 bytes
/// - [`CryptoError::Encryption`] if key setup or sealing fails
pub fn encrypt_aead(plaintext: &str, key_material: &str) -> Result<String, CryptoError> {
    let key = aead_key(key_material)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    // Seal in place — the buffer ends as ciphertext || tag.
    let mut in_out = plaintext.as_bytes().to_vec();
    if key
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption("AES-256-GCM sealing failed".into()));
    }

    Ok(format!(
        "{AEAD_PREFIX}{}:{}",
        HEXLOWER.encode(&nonce_bytes),
        HEXLOWER.encode(&in_out)
    ))
}

/// Encrypt with the digest-keyed counter-mode stream cipher.
///
/// Kept public for hosts without an AEAD primitive and for decrypt-support
/// testing. Confidentiality only — see the module docs.
///
/// Each 32-unit window of the plaintext is XORed against
/// `digest(key_material + nonce_hex + hex(window_index))`; every UTF-16 code
/// unit is emitted as 4 hex characters so the full code-unit range
/// round-trips losslessly.
#[must_use]
pub fn encrypt_fallback(plaintext: &str, key_material: &str) -> String {
    let mut nonce = [0u8; FALLBACK_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let nonce_hex = HEXLOWER.encode(&nonce);

    let body = mask_units_encode(plaintext, key_material, &nonce_hex);
    format!("{FALLBACK_PREFIX}{nonce_hex}:{body}")
}

// ---------------------------------------------------------------------------
// Decryption
// ---------------------------------------------------------------------------

/// Decrypt a container produced by [`encrypt`] or [`encrypt_fallback`].
///
/// Returns `None` on any failure — wrong key, tampered `v2:` data, malformed
/// hex, or an unrecognized prefix (including legacy un-prefixed formats).
/// Callers must treat `None` as a single undifferentiated "wrong password or
/// corrupted data" signal; the cipher cannot distinguish the two.
#[must_use]
pub fn decrypt(container: &str, key_material: &str) -> Option<String> {
    if let Some(rest) = container.strip_prefix(AEAD_PREFIX) {
        decrypt_aead(rest, key_material)
    } else if let Some(rest) = container.strip_prefix(FALLBACK_PREFIX) {
        decrypt_fallback(rest, key_material)
    } else {
        None
    }
}

fn decrypt_aead(rest: &str, key_material: &str) -> Option<String> {
    let (nonce_hex, cipher_hex) = rest.split_once(':')?;

    let nonce_bytes: [u8; NONCE_LEN] = HEXLOWER_PERMISSIVE
        .decode(nonce_hex.as_bytes())
        .ok()?
        .try_into()
        .ok()?;
    let mut in_out = HEXLOWER_PERMISSIVE.decode(cipher_hex.as_bytes()).ok()?;

    let key = aead_key(key_material).ok()?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);
    let plaintext = key
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .ok()?;

    String::from_utf8(plaintext.to_vec()).ok()
}

fn decrypt_fallback(rest: &str, key_material: &str) -> Option<String> {
    let (nonce_hex, body) = rest.split_once(':')?;

    // 4 hex characters per original code unit.
    if body.len().checked_rem(4) != Some(0) {
        return None;
    }
    let masked = body
        .as_bytes()
        .chunks(4)
        .map(|group| {
            std::str::from_utf8(group)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok())
        })
        .collect::<Option<Vec<u16>>>()?;

    let mut units = Vec::with_capacity(masked.len());
    for (index, chunk) in masked.chunks(WINDOW_LEN).enumerate() {
        let mut window = keystream_window(key_material, nonce_hex, index);
        for (value, key_byte) in chunk.iter().zip(window.iter()) {
            units.push(value ^ u16::from(*key_byte));
        }
        window.zeroize();
    }

    // Lossy on purpose: tampered ciphertext must decrypt to garbage, not
    // fail closed — this format carries no integrity information.
    Some(String::from_utf16_lossy(&units))
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Build the AES-256-GCM key from the first 32 bytes of the key material's
/// UTF-8 encoding.
fn aead_key(key_material: &str) -> Result<aead::LessSafeKey, CryptoError> {
    let bytes = key_material.as_bytes();
    let Some(key_bytes) = bytes.get(..KEY_LEN) else {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "need at least {KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    };
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key_bytes)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Keystream window `index`: 32 bytes of pad material for one plaintext window.
fn keystream_window(key_material: &str, nonce_hex: &str, index: usize) -> [u8; WINDOW_LEN] {
    digest::digest(format!("{key_material}{nonce_hex}{index:x}").as_bytes())
}

/// XOR each UTF-16 code unit against the keystream and emit 4 hex chars per unit.
fn mask_units_encode(plaintext: &str, key_material: &str, nonce_hex: &str) -> String {
    let units: Vec<u16> = plaintext.encode_utf16().collect();
    let mut out = String::with_capacity(units.len().saturating_mul(4));
    for (index, chunk) in units.chunks(WINDOW_LEN).enumerate() {
        let mut window = keystream_window(key_material, nonce_hex, index);
        for (unit, key_byte) in chunk.iter().zip(window.iter()) {
            let masked = unit ^ u16::from(*key_byte);
            out.push_str(&format!("{masked:04x}"));
        }
        window.zeroize();
    }
    out
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::hash_export_password;
    use proptest::prelude::*;

    /// 64-char key material, as produced by the credential hasher.
    fn test_key() -> String {
        hash_export_password("FilePass1")
    }

    /// Flip the final hex digit of a container to a different hex digit.
    fn tamper_last_hex_digit(container: &str) -> String {
        let mut chars: Vec<char> = container.chars().collect();
        let last = chars.last().copied().expect("container is not empty");
        let replacement = if last == '0' { '1' } else { '0' };
        if let Some(slot) = chars.last_mut() {
            *slot = replacement;
        }
        chars.into_iter().collect()
    }

    #[test]
    fn aead_roundtrip() {
        let key = test_key();
        let container = encrypt("secret bundle data", &key);
        assert!(container.starts_with(AEAD_PREFIX));
        assert_eq!(decrypt(&container, &key), Some("secret bundle data".into()));
    }

    #[test]
    fn aead_container_has_three_colon_separated_parts() {
        let container = encrypt("x", &test_key());
        let parts: Vec<&str> = container.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "v2");
        assert_eq!(parts[1].len(), NONCE_LEN * 2);
    }

    #[test]
    fn aead_wrong_key_fails() {
        let container = encrypt("secret", &test_key());
        let other = hash_export_password("WrongFile");
        assert_eq!(decrypt(&container, &other), None);
    }

    #[test]
    fn aead_tampered_ciphertext_fails() {
        let key = test_key();
        let container = encrypt("secret", &key);
        assert_eq!(decrypt(&tamper_last_hex_digit(&container), &key), None);
    }

    #[test]
    fn aead_tampered_nonce_fails() {
        let key = test_key();
        let container = encrypt("secret", &key);
        let mut parts: Vec<String> = container.split(':').map(String::from).collect();
        parts[1] = tamper_last_hex_digit(&parts[1]);
        assert_eq!(decrypt(&parts.join(":"), &key), None);
    }

    #[test]
    fn aead_decrypt_matches_independent_implementation() {
        // Generated with an independent AES-256-GCM implementation:
        // key material = hash_export_password("FilePass1"), fixed nonce.
        let container =
            "v2:000102030405060708090a0b:66b86cd6c4f126182e51cb94b8d056ec9ef3e9af49766c652125e7c4f3";
        assert_eq!(decrypt(container, &test_key()), Some("interop check".into()));
    }

    #[test]
    fn aead_empty_plaintext_roundtrip() {
        let key = test_key();
        let container = encrypt("", &key);
        assert_eq!(decrypt(&container, &key), Some(String::new()));
    }

    #[test]
    fn two_encrypts_produce_different_containers() {
        let key = test_key();
        assert_ne!(encrypt("same", &key), encrypt("same", &key));
    }

    #[test]
    fn unrecognized_prefix_fails_closed() {
        let key = test_key();
        assert_eq!(decrypt("v1:00:00", &key), None);
        assert_eq!(decrypt("deadbeef", &key), None);
        assert_eq!(decrypt("", &key), None);
    }

    #[test]
    fn malformed_aead_container_fails() {
        let key = test_key();
        assert_eq!(decrypt("v2:missing-cipher-part", &key), None);
        assert_eq!(decrypt("v2:zzzz:zzzz", &key), None);
        assert_eq!(decrypt("v2:00:00", &key), None); // nonce too short
    }

    #[test]
    fn short_key_material_errors_on_aead_and_falls_back_on_encrypt() {
        let short = "only-20-chars-of-key";
        assert!(matches!(
            encrypt_aead("x", short),
            Err(CryptoError::InvalidKeyMaterial(_))
        ));
        let container = encrypt("x", short);
        assert!(container.starts_with(FALLBACK_PREFIX));
        assert_eq!(decrypt(&container, short), Some("x".into()));
    }

    #[test]
    fn fallback_roundtrip() {
        let key = test_key();
        let container = encrypt_fallback("hello rockpool é水", &key);
        assert!(container.starts_with(FALLBACK_PREFIX));
        assert_eq!(decrypt(&container, &key), Some("hello rockpool é水".into()));
    }

    #[test]
    fn fallback_roundtrip_full_code_unit_range() {
        let key = test_key();
        // Includes a surrogate pair (non-BMP) and a NUL.
        let text = "a\u{0}\u{1F30A}𝄞 end";
        let container = encrypt_fallback(text, &key);
        assert_eq!(decrypt(&container, &key), Some(text.into()));
    }

    #[test]
    fn fallback_body_is_four_hex_chars_per_unit() {
        let container = encrypt_fallback("abc", &test_key());
        let body = container.split(':').nth(2).expect("three parts");
        assert_eq!(body.len(), 12);
    }

    #[test]
    fn fallback_decrypt_matches_independent_implementation() {
        let container = "v2-js:00112233445566778899aabbccddeeff:009500dd008600a900d1004500aa00e3007d0073000d0021006b00f700f100f66c6d";
        assert_eq!(
            decrypt(container, &test_key()),
            Some("hello rockpool é水".into())
        );
    }

    #[test]
    fn fallback_multi_window_decrypt_matches_independent_implementation() {
        // 70 code units — exercises three keystream windows.
        let container = "v2-js:00112233445566778899aabbccddeeff:00cd008900d800f6008a005000ee00bb00260021004d007f003600a800e5002a006f009000e00079002e009500360010007200d000a5009a00ca00570092006300d000a300000076008000f00099008300a500b0002a0064004800570011003a00c600c2001100a6002200e400e100b400c400a6009300f700bc008e00740071000a00d0006f0078009e0004";
        assert_eq!(
            decrypt(container, &test_key()),
            Some("0123456789".repeat(7))
        );
    }

    #[test]
    fn fallback_tamper_decrypts_to_garbage_instead_of_failing() {
        // Documented non-property: the fallback has no integrity protection.
        let key = test_key();
        let container = encrypt_fallback("integrity-free zone", &key);
        let tampered = tamper_last_hex_digit(&container);
        let decrypted = decrypt(&tampered, &key).expect("fallback never fails on hex body");
        assert_ne!(decrypted, "integrity-free zone");
        assert_eq!(decrypted.encode_utf16().count(), "integrity-free zone".len());
    }

    #[test]
    fn fallback_wrong_key_yields_garbage_not_failure() {
        // Same non-property from the other direction: a wrong key is
        // indistinguishable from tampering, and neither fails closed.
        let key = test_key();
        let container = encrypt_fallback("plaintext", &key);
        let other = hash_export_password("WrongFile");
        let decrypted = decrypt(&container, &other).expect("fallback never fails on hex body");
        assert_ne!(decrypted, "plaintext");
    }

    #[test]
    fn fallback_rejects_truncated_body() {
        let key = test_key();
        let container = encrypt_fallback("abc", &key);
        // Drop one hex char — no longer a multiple of 4.
        let truncated = &container[..container.len() - 1];
        assert_eq!(decrypt(truncated, &key), None);
    }

    #[test]
    fn fallback_rejects_non_hex_body() {
        assert_eq!(
            decrypt("v2-js:00112233445566778899aabbccddeeff:zzzz", &test_key()),
            None
        );
    }

    #[test]
    fn fallback_empty_plaintext_roundtrip() {
        let key = test_key();
        let container = encrypt_fallback("", &key);
        assert_eq!(decrypt(&container, &key), Some(String::new()));
    }

    proptest! {
        #[test]
        fn aead_roundtrip_holds_for_any_text(text in ".*") {
            let key = hash_export_password("proptest-key");
            let container = encrypt(&text, &key);
            prop_assert_eq!(decrypt(&container, &key), Some(text));
        }

        #[test]
        fn fallback_roundtrip_holds_for_any_text(text in ".*") {
            let key = hash_export_password("proptest-key");
            let container = encrypt_fallback(&text, &key);
            prop_assert_eq!(decrypt(&container, &key), Some(text));
        }
    }
}
