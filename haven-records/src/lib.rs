//! Record service client and protocol orchestration for Haven.
//!
//! The backend is a generic record store with one row-level rule: a
//! mutation or delete succeeds only when the presented transition token
//! equals the record's stored guard field. Everything that makes that
//! rule useful lives here, on the client:
//!
//! - session key flows (registration, login, password change)
//! - the two-phase create -> promote record lifecycle and guarded
//!   mutations ([`lifecycle`])
//! - bulk purge with empty-namespace verification ([`purge`])
//! - decrypt-with-retry and the shared key-missing signal ([`retry`])
//!
//! The backend never sees plaintext or key material: record payloads
//! are ChaCha20-Poly1305 ciphertext under the session's main secret,
//! and authorization rides on guard tokens derived in `haven-crypto`.

pub mod api_client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod purge;
pub mod retry;
pub mod session;
pub mod types;

pub use api_client::RecordApiClient;
pub use config::ServiceConfig;
pub use error::{RecordError, RecordResult};
pub use lifecycle::{decode_record, DeleteOutcome, RecordLifecycle, SealedRecord};
pub use purge::{PurgeReport, PurgeRunner};
pub use retry::{decrypt_with_attempts, decrypt_with_retry, DecryptAttempt, KeyStateSignal};
pub use session::{change_password, open_session, register_keys, Session};
pub use types::{
    IdentityRecord, ModuleHandle, NewRecord, RecordEnvelope, RecordPage, RecordPatch, LIST_SORT,
};
