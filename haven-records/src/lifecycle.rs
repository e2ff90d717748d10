//! Record lifecycle: two-phase create, guarded update and delete.
//!
//! Per-record state machine:
//!
//! ```text
//! absent -> pending("init") -> sealed(guard) -> deleted
//! ```
//!
//! Create runs in two phases because the guard is derived from the
//! backend-assigned id: first a create carrying the sentinel, then a
//! promote patch that installs the derived token. A crash between the
//! two leaves a pending record behind; that window is expected, and
//! purge — not create-time retry — is the recovery path.
//!
//! No operation applies plaintext locally before the remote call
//! confirms, so cancelling an in-flight call leaves state as if it had
//! never started.

use crate::api_client::RecordApiClient;
use crate::error::{RecordError, RecordResult};
use crate::retry::{decrypt_with_retry, KeyStateSignal};
use crate::session::Session;
use crate::types::{ModuleHandle, NewRecord, RecordEnvelope, RecordPatch};
use base64::{engine::general_purpose::STANDARD, Engine};
use haven_crypto::{derive_guard, encrypt, EncryptedData, GUARD_INIT, NONCE_SIZE};
use std::sync::Arc;
use tracing::{debug, warn};

/// A record past the promote phase: its stored guard is the derived
/// token.
#[derive(Clone, Debug)]
pub struct SealedRecord {
    pub id: String,
    pub guard: String,
}

/// Which path a delete took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deleted with the derived guard (record was sealed).
    Guarded,
    /// The derived guard was rejected and the sentinel fallback
    /// succeeded (record never left pending).
    SentinelFallback,
}

/// Orchestrates record mutations against the record service.
pub struct RecordLifecycle {
    api: Arc<RecordApiClient>,
}

impl RecordLifecycle {
    pub fn new(api: Arc<RecordApiClient>) -> Self {
        Self { api }
    }

    /// Creates and seals a record: encrypt, create with the sentinel,
    /// then promote the backend-assigned id to its derived guard.
    ///
    /// A failure after create leaves a pending record behind; it is
    /// logged and the error propagates — recovery happens in purge.
    pub async fn create_sealed(
        &self,
        session: &Session,
        module: &ModuleHandle,
        plaintext: &[u8],
    ) -> RecordResult<SealedRecord> {
        let encrypted = encrypt(session.main_secret(), plaintext)?;
        let body = NewRecord {
            module_namespace: module.namespace.clone(),
            payload: STANDARD.encode(&encrypted.ciphertext),
            cipher_iv: STANDARD.encode(encrypted.nonce),
            guard: GUARD_INIT.to_string(),
        };
        let created = self.api.create(&module.collection, &body).await?;

        let guard = derive_guard(session.main_secret(), &module.namespace, &created.id)?;
        let promote = RecordPatch {
            guard: Some(guard.clone()),
            ..Default::default()
        };
        if let Err(err) = self
            .api
            .patch(&module.collection, &created.id, &module.namespace, GUARD_INIT, &promote)
            .await
        {
            warn!(
                "record {} left pending in namespace {}: promote failed",
                created.id, module.namespace
            );
            return Err(err);
        }

        debug!("sealed record {} in namespace {}", created.id, module.namespace);
        Ok(SealedRecord {
            id: created.id,
            guard,
        })
    }

    /// Re-encrypts and patches a sealed record, presenting its derived
    /// guard.
    pub async fn update(
        &self,
        session: &Session,
        module: &ModuleHandle,
        id: &str,
        plaintext: &[u8],
    ) -> RecordResult<RecordEnvelope> {
        let guard = derive_guard(session.main_secret(), &module.namespace, id)?;
        let encrypted = encrypt(session.main_secret(), plaintext)?;
        let patch = RecordPatch {
            payload: Some(STANDARD.encode(&encrypted.ciphertext)),
            cipher_iv: Some(STANDARD.encode(encrypted.nonce)),
            guard: None,
        };

        self.api
            .patch(&module.collection, id, &module.namespace, &guard, &patch)
            .await
    }

    /// Deletes a record, retrying once with the sentinel if the
    /// derived guard is rejected. The fallback covers records that
    /// crashed between create and promote and still store `"init"`.
    pub async fn delete(
        &self,
        session: &Session,
        module: &ModuleHandle,
        id: &str,
    ) -> RecordResult<DeleteOutcome> {
        let guard = derive_guard(session.main_secret(), &module.namespace, id)?;
        match self
            .api
            .delete(&module.collection, id, &module.namespace, &guard)
            .await
        {
            Ok(()) => Ok(DeleteOutcome::Guarded),
            Err(RecordError::Rejected) => {
                debug!("guarded delete rejected for {id}, retrying with sentinel");
                self.api
                    .delete(&module.collection, id, &module.namespace, GUARD_INIT)
                    .await?;
                Ok(DeleteOutcome::SentinelFallback)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetches a record and decrypts its payload.
    pub async fn read(
        &self,
        session: &Session,
        module: &ModuleHandle,
        id: &str,
        signal: &KeyStateSignal,
    ) -> RecordResult<Vec<u8>> {
        let envelope = self
            .api
            .get(&module.collection, id, &module.namespace)
            .await?;
        let encrypted = decode_record(&envelope)?;
        decrypt_with_retry(session.main_secret(), &encrypted, signal)
    }
}

/// Decodes a wire record's base64 fields into AEAD input.
pub fn decode_record(record: &RecordEnvelope) -> RecordResult<EncryptedData> {
    let iv = STANDARD
        .decode(&record.cipher_iv)
        .map_err(|e| RecordError::InvalidArgument(format!("invalid cipher_iv encoding: {e}")))?;
    if iv.len() != NONCE_SIZE {
        return Err(RecordError::InvalidArgument(format!(
            "cipher_iv must be {NONCE_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    let ciphertext = STANDARD
        .decode(&record.payload)
        .map_err(|e| RecordError::InvalidArgument(format!("invalid payload encoding: {e}")))?;

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&iv);

    Ok(EncryptedData { nonce, ciphertext })
}
