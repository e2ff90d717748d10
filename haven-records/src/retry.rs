//! Decrypt-with-retry and the shared key-state signal.
//!
//! A classified cryptographic failure is retried exactly once. A
//! second failure raises [`RecordError::KeyMissing`] and marks the
//! shared signal, after which the application should treat all
//! encrypted reads as unavailable until re-authentication restores the
//! main secret. Non-cryptographic failures propagate immediately,
//! without retry and without touching the signal.

use crate::error::{RecordError, RecordResult};
use haven_crypto::{decrypt, CipherKey, CryptoError, EncryptedData};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

const DECRYPT_ATTEMPTS: u8 = 2;

/// Shared "key missing" condition, cloneable across the application.
///
/// This is the sole bridge between decryption failures and the rest of
/// the app: UI layers subscribe and switch to a re-authentication
/// prompt when it fires.
#[derive(Clone)]
pub struct KeyStateSignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    tx: watch::Sender<bool>,
    marks: AtomicUsize,
}

impl KeyStateSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(SignalInner {
                tx,
                marks: AtomicUsize::new(0),
            }),
        }
    }

    /// Marks the key as missing. Subscribers observe the transition;
    /// repeated marks keep the state set.
    pub fn mark_missing(&self) {
        self.inner.marks.fetch_add(1, Ordering::SeqCst);
        self.inner.tx.send_replace(true);
    }

    /// Clears the condition after re-authentication.
    pub fn clear(&self) {
        self.inner.tx.send_replace(false);
    }

    pub fn is_missing(&self) -> bool {
        *self.inner.tx.borrow()
    }

    /// Number of times the signal has been marked since creation.
    pub fn mark_count(&self) -> usize {
        self.inner.marks.load(Ordering::SeqCst)
    }

    /// Watch-style subscription for UI layers.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }
}

impl Default for KeyStateSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the bounded decrypt loop. The variants keep the two
/// attempts distinguishable instead of hiding them in catch-and-retry
/// control flow.
#[derive(Debug)]
pub enum DecryptAttempt {
    /// First attempt succeeded.
    First(Vec<u8>),
    /// First attempt failed cryptographically, the retry succeeded.
    Retry(Vec<u8>),
    /// Both attempts failed cryptographically.
    Exhausted { attempts: u8 },
}

/// Runs the bounded decrypt loop without touching the signal.
///
/// Only authentication failures are retried; anything else (malformed
/// input, invalid arguments) propagates immediately.
pub fn decrypt_with_attempts(
    key: &CipherKey,
    encrypted: &EncryptedData,
) -> RecordResult<DecryptAttempt> {
    match decrypt(key, encrypted) {
        Ok(plaintext) => Ok(DecryptAttempt::First(plaintext)),
        Err(CryptoError::Decryption(_)) => match decrypt(key, encrypted) {
            Ok(plaintext) => Ok(DecryptAttempt::Retry(plaintext)),
            Err(CryptoError::Decryption(_)) => Ok(DecryptAttempt::Exhausted {
                attempts: DECRYPT_ATTEMPTS,
            }),
            Err(other) => Err(other.into()),
        },
        Err(other) => Err(other.into()),
    }
}

/// Decrypts with a single retry; on exhaustion marks the shared signal
/// exactly once and raises [`RecordError::KeyMissing`].
pub fn decrypt_with_retry(
    key: &CipherKey,
    encrypted: &EncryptedData,
    signal: &KeyStateSignal,
) -> RecordResult<Vec<u8>> {
    match decrypt_with_attempts(key, encrypted)? {
        DecryptAttempt::First(plaintext) => Ok(plaintext),
        DecryptAttempt::Retry(plaintext) => {
            warn!("decryption succeeded only on retry");
            Ok(plaintext)
        }
        DecryptAttempt::Exhausted { attempts } => {
            warn!("decryption failed after {attempts} attempts, marking key missing");
            signal.mark_missing();
            Err(RecordError::KeyMissing)
        }
    }
}
