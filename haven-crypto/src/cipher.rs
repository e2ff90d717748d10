//! Authenticated encryption with ChaCha20-Poly1305.

use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// 96-bit AEAD nonce.
pub const NONCE_SIZE: usize = 12;
/// Poly1305 tag appended to the ciphertext.
pub const TAG_SIZE: usize = 16;

/// AEAD output: the random nonce plus ciphertext (tag appended).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts a payload under the given key with a fresh random nonce.
///
/// Each call draws 96 random bits, so a nonce is never reused for a key
/// and two encryptions of the same plaintext differ.
pub fn encrypt(key: &CipherKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts and authenticates. Fails closed: a wrong key, tampering, or
/// corruption yields `CryptoError::Decryption` and no partial output.
pub fn decrypt(key: &CipherKey, encrypted: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(
            Nonce::from_slice(&encrypted.nonce),
            encrypted.ciphertext.as_slice(),
        )
        .map_err(|_| {
            CryptoError::Decryption("authentication failed (wrong key or tampered data)".to_string())
        })
}

/// Encrypts a UTF-8 string.
pub fn encrypt_string(key: &CipherKey, plaintext: &str) -> CryptoResult<EncryptedData> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypts to a UTF-8 string.
pub fn decrypt_string(key: &CipherKey, encrypted: &EncryptedData) -> CryptoResult<String> {
    let bytes = decrypt(key, encrypted)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::Decryption(format!("plaintext is not valid UTF-8: {e}")))
}
