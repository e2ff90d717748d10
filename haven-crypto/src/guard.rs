//! Per-record capability token derivation.
//!
//! A guard token proves possession of the main secret scoped to one
//! (namespace, record id) pair. Derivation is a two-level HMAC-SHA256
//! chain: main secret -> namespace guard key -> record token. The
//! backend stores only the current token per record and compares
//! strings; the token is a pure function of its inputs and is never
//! kept as client state.

use crate::error::{CryptoError, CryptoResult};
use crate::key::CipherKey;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Reserved guard value the backend accepts only for the
/// create -> promote transition of an authenticated session. Carries no
/// authorization weight by itself.
pub const GUARD_INIT: &str = "init";

/// Prefix distinguishing derived tokens from the sentinel.
pub const GUARD_PREFIX: &str = "g_";

/// Derives the per-namespace guard key:
/// `HMAC-SHA256(main_secret, "guard:" + namespace)`.
pub fn namespace_guard_key(main_secret: &CipherKey, namespace: &str) -> CryptoResult<CipherKey> {
    if namespace.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "namespace must not be empty".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(main_secret.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(b"guard:");
    mac.update(namespace.as_bytes());

    let digest = mac.finalize().into_bytes();
    CipherKey::from_slice(digest.as_slice())
}

/// Derives a record's guard token:
/// `"g_" + hex(HMAC-SHA256(namespace_guard_key, record_id))`.
pub fn derive_guard(
    main_secret: &CipherKey,
    namespace: &str,
    record_id: &str,
) -> CryptoResult<String> {
    if record_id.is_empty() {
        return Err(CryptoError::InvalidArgument(
            "record id must not be empty".to_string(),
        ));
    }

    let namespace_key = namespace_guard_key(main_secret, namespace)?;
    let mut mac = HmacSha256::new_from_slice(namespace_key.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(record_id.as_bytes());

    let digest = mac.finalize().into_bytes();
    Ok(format!("{GUARD_PREFIX}{}", hex::encode(digest)))
}
