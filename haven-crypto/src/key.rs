//! Key material and password-based key derivation.
//!
//! All key material flows through one canonical type, [`CipherKey`]:
//! the main secret, the password-derived protection key, and the
//! per-namespace guard keys are all 32-byte buffers. Conversions to and
//! from text encodings happen only at the transport boundary.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const SALT_SIZE: usize = 16;

/// Canonical 32-byte symmetric key buffer, zeroed on drop.
///
/// Dropping the session's main secret is how logout destroys key
/// material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_SIZE]);

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; KEY_SIZE];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(text)
            .map_err(|e| CryptoError::InvalidArgument(format!("invalid base64 key: {e}")))?;
        Self::from_slice(&bytes)
    }
}

// Key bytes must never leak through logging.
impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// Per-user key-derivation salt. Random 16 bytes, stored server-side in
/// the clear; not a secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(text)
            .map_err(|e| CryptoError::InvalidArgument(format!("invalid base64 salt: {e}")))?;
        if bytes.len() != SALT_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SALT_SIZE,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; SALT_SIZE];
        buf.copy_from_slice(&bytes);
        Ok(Self(buf))
    }
}

/// Argon2id parameters.
///
/// The defaults are fixed for the product's lifetime: every stored
/// envelope was wrapped under a key derived with them, and changing
/// them requires a migration path for every envelope.
#[derive(Clone, Debug)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost_kib: u32,
    /// Number of iterations.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: 64 * 1024,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

/// Derives the protection key from a password and per-user salt
/// (Argon2id, 32-byte output).
///
/// The protection key is never persisted; it is recomputed on every
/// login and on both sides of a password change.
pub fn derive_protection_key(
    password: &str,
    salt: &Salt,
    params: &KdfParams,
) -> CryptoResult<CipherKey> {
    if password.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "password must not be empty".to_string(),
        ));
    }

    let argon_params = Params::new(params.m_cost_kib, params.t_cost, params.p_cost, Some(KEY_SIZE))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(CipherKey::from_bytes(out))
}

/// Generates a fresh random 32-byte main secret.
pub fn generate_main_secret() -> CipherKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    CipherKey::from_bytes(bytes)
}
