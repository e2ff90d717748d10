//! Main-key envelope: wrapping the main secret under the protection key.
//!
//! The envelope is the only key-material ciphertext the backend stores.
//! It travels as `{iv, data}` JSON attached to the user's identity
//! record, next to the base64 key-derivation salt. Only someone who can
//! reproduce the protection key from the correct password and that salt
//! can open it.

use crate::cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Wire form of the wrapped main secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainKeyEnvelope {
    /// Base64 of the 96-bit AEAD nonce.
    pub iv: String,
    /// Base64 of the ciphertext.
    pub data: String,
}

/// Wraps the main secret under the protection key.
///
/// The secret is normalized to base64 text before encryption so the
/// plaintext shape is stable across clients. Output fields are encoded
/// exactly once; the legacy double encoding is supported on read only.
pub fn wrap_main_secret(
    secret: &CipherKey,
    protection: &CipherKey,
) -> CryptoResult<MainKeyEnvelope> {
    let normalized = secret.to_base64();
    let encrypted = encrypt(protection, normalized.as_bytes())?;

    Ok(MainKeyEnvelope {
        iv: STANDARD.encode(encrypted.nonce),
        data: STANDARD.encode(&encrypted.ciphertext),
    })
}

/// Unwraps the main secret from its envelope.
///
/// Primary path: decode each field once, then decrypt. Some historical
/// envelopes had both fields base64-encoded twice on write; if the
/// primary attempt fails, decode a second time and retry before giving
/// up. The fallback is never attempted first.
pub fn unwrap_main_secret(
    envelope: &MainKeyEnvelope,
    protection: &CipherKey,
) -> CryptoResult<CipherKey> {
    let primary = decode_and_decrypt(&envelope.iv, &envelope.data, protection);
    let primary_err = match primary {
        Ok(secret) => return Ok(secret),
        Err(err) => err,
    };

    match (strip_outer_base64(&envelope.iv), strip_outer_base64(&envelope.data)) {
        (Some(iv), Some(data)) => decode_and_decrypt(&iv, &data, protection).map_err(|_| primary_err),
        _ => Err(primary_err),
    }
}

/// Re-wraps the main secret for a password change.
///
/// The unwrap (with legacy fallback) must succeed before anything is
/// produced, so a wrong old password aborts with no output. The secret
/// itself is unchanged; records encrypted under it are untouched.
pub fn rewrap_main_secret(
    envelope: &MainKeyEnvelope,
    old_protection: &CipherKey,
    new_protection: &CipherKey,
) -> CryptoResult<MainKeyEnvelope> {
    let secret = unwrap_main_secret(envelope, old_protection)?;
    wrap_main_secret(&secret, new_protection)
}

fn decode_and_decrypt(
    iv_b64: &str,
    data_b64: &str,
    protection: &CipherKey,
) -> CryptoResult<CipherKey> {
    let iv = STANDARD
        .decode(iv_b64)
        .map_err(|e| CryptoError::Decryption(format!("invalid iv encoding: {e}")))?;
    if iv.len() != NONCE_SIZE {
        return Err(CryptoError::Decryption(format!(
            "unexpected iv length: {}",
            iv.len()
        )));
    }
    let ciphertext = STANDARD
        .decode(data_b64)
        .map_err(|e| CryptoError::Decryption(format!("invalid data encoding: {e}")))?;

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&iv);

    let plaintext = decrypt(protection, &EncryptedData { nonce, ciphertext })?;
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| CryptoError::Decryption("wrapped secret is not valid text".to_string()))?;

    CipherKey::from_base64(text)
        .map_err(|_| CryptoError::Decryption("wrapped secret is malformed".to_string()))
}

/// Undoes one extra layer of base64, if the field decodes to text.
fn strip_outer_base64(field: &str) -> Option<String> {
    let bytes = STANDARD.decode(field).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_main_secret;

    #[test]
    fn wrap_produces_single_encoding() {
        let secret = generate_main_secret();
        let protection = generate_main_secret();
        let envelope = wrap_main_secret(&secret, &protection).unwrap();

        // A single decode must yield raw nonce/ciphertext bytes, not
        // another base64 layer.
        let iv = STANDARD.decode(&envelope.iv).unwrap();
        assert_eq!(iv.len(), NONCE_SIZE);
    }

    #[test]
    fn legacy_double_encoded_envelope_unwraps() {
        let secret = generate_main_secret();
        let protection = generate_main_secret();
        let envelope = wrap_main_secret(&secret, &protection).unwrap();

        let legacy = MainKeyEnvelope {
            iv: STANDARD.encode(envelope.iv.as_bytes()),
            data: STANDARD.encode(envelope.data.as_bytes()),
        };

        let recovered = unwrap_main_secret(&legacy, &protection).unwrap();
        assert_eq!(recovered.as_bytes(), secret.as_bytes());
    }

    #[test]
    fn wrong_protection_key_fails_both_paths() {
        let secret = generate_main_secret();
        let envelope = wrap_main_secret(&secret, &generate_main_secret()).unwrap();

        let result = unwrap_main_secret(&envelope, &generate_main_secret());
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }
}
