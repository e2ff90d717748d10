//! Wire types for the record service.

use serde::{Deserialize, Serialize};

/// Stable sort applied to every list sweep. Paging must be
/// deterministic so purge accounting sees each record exactly once.
pub const LIST_SORT: &str = "created";

/// A record as the backend stores it: opaque ciphertext plus the
/// scoping namespace and the current guard value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordEnvelope {
    pub id: String,
    pub module_namespace: String,
    /// Base64 of the AEAD ciphertext.
    pub payload: String,
    /// Base64 of the 96-bit nonce.
    pub cipher_iv: String,
    /// Either the literal sentinel or a `"g_"` + 64-hex-char token.
    pub guard: String,
}

/// Create request body. The backend assigns the id.
#[derive(Clone, Debug, Serialize)]
pub struct NewRecord {
    pub module_namespace: String,
    pub payload: String,
    pub cipher_iv: String,
    pub guard: String,
}

/// Patch body; absent fields are left unchanged by the backend.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

/// One page of a list sweep.
#[derive(Clone, Debug, Deserialize)]
pub struct RecordPage {
    pub items: Vec<RecordEnvelope>,
    #[serde(rename = "totalItems")]
    pub total_items: u64,
}

/// Key material attached to the user's identity record: the wrapped
/// main secret and the key-derivation salt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    /// JSON `{iv, data}` of the main-key envelope.
    pub encrypted_key: String,
    /// Base64 of the 16-byte salt (non-secret).
    pub encryption_salt: String,
}

/// A module's backend collection plus its minted namespace ("sid").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHandle {
    pub collection: String,
    pub namespace: String,
}

impl ModuleHandle {
    pub fn new(collection: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            namespace: namespace.into(),
        }
    }

    /// Mints a namespace for a newly enabled module: a random opaque
    /// string, visible to the backend as a scoping value but
    /// unlinkable to the user's identity.
    pub fn mint(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            namespace: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}
