//! Client-side encryption core for Haven.
//!
//! Keeps all record content confidential from the record service while
//! still letting it enforce row-level rules, using three pieces:
//!
//! 1. **Main secret**: 32 random bytes generated once at registration,
//!    held only in memory for the session. Every record payload is
//!    encrypted under it with ChaCha20-Poly1305.
//!
//! 2. **Protection key**: derived from the password with Argon2id and
//!    used only to wrap/unwrap the main secret. The wrapped envelope is
//!    the only key material the backend ever stores, so a password
//!    change re-wraps the envelope and never touches a record.
//!
//! 3. **Guard tokens**: a deterministic HMAC-SHA256 chain over
//!    (main secret, module namespace, record id). The backend's sole
//!    authorization signal is a string comparison against the stored
//!    token; the token itself is safe to recompute on demand and is
//!    never persisted client-side.
//!
//! All key material flows through the canonical [`CipherKey`] buffer,
//! which zeroes itself on drop.

mod cipher;
pub mod envelope;
mod error;
pub mod guard;
mod key;

pub use cipher::{
    decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use envelope::{rewrap_main_secret, unwrap_main_secret, wrap_main_secret, MainKeyEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use guard::{derive_guard, namespace_guard_key, GUARD_INIT, GUARD_PREFIX};
pub use key::{
    derive_protection_key, generate_main_secret, CipherKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE,
};
