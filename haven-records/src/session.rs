//! Session key flows: registration, login, password change.
//!
//! The main secret never lives in ambient state. It sits inside a
//! [`Session`] that callers pass into every encrypt/decrypt/guard
//! call, and the underlying buffer is zeroed when the session drops —
//! logout is `drop(session)`.

use crate::api_client::RecordApiClient;
use crate::error::RecordResult;
use haven_crypto::{
    derive_protection_key, generate_main_secret, rewrap_main_secret, unwrap_main_secret,
    wrap_main_secret, CipherKey, KdfParams, MainKeyEnvelope, Salt,
};
use tracing::{debug, info};

/// In-memory session context: the identity plus the unwrapped main
/// secret for this login.
pub struct Session {
    user_id: String,
    main_secret: CipherKey,
}

impl Session {
    /// Wraps an already-unwrapped main secret into a session context.
    pub fn new(user_id: impl Into<String>, main_secret: CipherKey) -> Self {
        Self {
            user_id: user_id.into(),
            main_secret,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn main_secret(&self) -> &CipherKey {
        &self.main_secret
    }
}

/// Generates key material for a new account and persists the wrapped
/// envelope and salt on the identity record.
///
/// The salt is stored in the clear (it is not a secret); the main
/// secret leaves the client only inside the envelope.
pub async fn register_keys(
    api: &RecordApiClient,
    user_id: &str,
    password: &str,
) -> RecordResult<Session> {
    let salt = Salt::random();
    let protection = derive_protection_key(password, &salt, &KdfParams::default())?;
    let main_secret = generate_main_secret();
    let envelope = wrap_main_secret(&main_secret, &protection)?;

    let envelope_json = serde_json::to_string(&envelope)?;
    api.save_identity_key(user_id, &envelope_json, &salt.to_base64())
        .await?;
    info!("registered key material for identity {user_id}");

    Ok(Session::new(user_id, main_secret))
}

/// Opens a session from a password: fetches the identity's envelope
/// and salt, re-derives the protection key, and unwraps the main
/// secret. Legacy double-encoded envelopes are handled on read.
pub async fn open_session(
    api: &RecordApiClient,
    user_id: &str,
    password: &str,
) -> RecordResult<Session> {
    let identity = api.fetch_identity(user_id).await?;
    let envelope: MainKeyEnvelope = serde_json::from_str(&identity.encrypted_key)?;
    let salt = Salt::from_base64(&identity.encryption_salt)?;

    let protection = derive_protection_key(password, &salt, &KdfParams::default())?;
    let main_secret = unwrap_main_secret(&envelope, &protection)?;
    debug!("opened session for identity {user_id}");

    Ok(Session::new(user_id, main_secret))
}

/// Changes the account password.
///
/// The envelope must open under the old password before anything is
/// written; a wrong old password aborts here. The salt is reused and
/// the main secret is unchanged, so no stored record is touched — only
/// the envelope is replaced.
pub async fn change_password(
    api: &RecordApiClient,
    user_id: &str,
    old_password: &str,
    new_password: &str,
) -> RecordResult<()> {
    let identity = api.fetch_identity(user_id).await?;
    let envelope: MainKeyEnvelope = serde_json::from_str(&identity.encrypted_key)?;
    let salt = Salt::from_base64(&identity.encryption_salt)?;

    let old_protection = derive_protection_key(old_password, &salt, &KdfParams::default())?;
    let new_protection = derive_protection_key(new_password, &salt, &KdfParams::default())?;
    let rewrapped = rewrap_main_secret(&envelope, &old_protection, &new_protection)?;

    api.save_identity_key(user_id, &serde_json::to_string(&rewrapped)?, &identity.encryption_salt)
        .await?;
    info!("rotated main-key envelope for identity {user_id}");
    Ok(())
}
