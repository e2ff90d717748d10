//! HTTP client for the record service.
//!
//! A thin wrapper over the backend's collection CRUD: list, get,
//! create, patch, delete, plus identity key persistence. The scoping
//! namespace and the transition token travel as query parameters; the
//! backend's only mutation rule is "stored guard equals presented
//! token" (create additionally requires an authenticated session and
//! the sentinel).

use crate::config::ServiceConfig;
use crate::error::{RecordError, RecordResult};
use crate::types::{IdentityRecord, NewRecord, RecordEnvelope, RecordPage, RecordPatch};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::debug;

const IDENTITY_COLLECTION: &str = "identities";

/// Client for the record service.
pub struct RecordApiClient {
    client: Client,
    config: ServiceConfig,
    session_token: RwLock<Option<String>>,
}

impl RecordApiClient {
    pub fn new(config: ServiceConfig) -> RecordResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            session_token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Sets the session token (fresh login or restored session).
    pub async fn set_session_token(&self, token: String) {
        *self.session_token.write().await = Some(token);
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session_token.read().await.is_some()
    }

    /// Clears the session token.
    pub async fn logout(&self) {
        *self.session_token.write().await = None;
    }

    async fn bearer(&self) -> RecordResult<String> {
        self.session_token
            .read()
            .await
            .clone()
            .ok_or(RecordError::AuthRequired)
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{collection}/records", self.config.base_url)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/api/collections/{collection}/records/{id}",
            self.config.base_url
        )
    }

    /// Maps the backend's refusals onto the error taxonomy. Guard
    /// mismatches and missing records both come back as `Rejected`.
    fn check(resp: reqwest::Response) -> RecordResult<reqwest::Response> {
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(RecordError::AuthRequired),
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(RecordError::Rejected)
            }
            _ => resp
                .error_for_status()
                .map_err(|e| RecordError::Api(e.to_string())),
        }
    }

    // ── Records ──

    /// Lists one page of a namespace, with a caller-fixed stable sort.
    pub async fn list(
        &self,
        collection: &str,
        namespace: &str,
        page: u32,
        per_page: u32,
        sort: &str,
    ) -> RecordResult<RecordPage> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .get(self.records_url(collection))
            .bearer_auth(&token)
            .query(&[("namespace", namespace), ("sort", sort)])
            .query(&[("page", page.to_string()), ("perPage", per_page.to_string())])
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    pub async fn get(
        &self,
        collection: &str,
        id: &str,
        namespace: &str,
    ) -> RecordResult<RecordEnvelope> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .get(self.record_url(collection, id))
            .bearer_auth(&token)
            .query(&[("namespace", namespace)])
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    /// Creates a record; the backend assigns and returns the id.
    pub async fn create(&self, collection: &str, body: &NewRecord) -> RecordResult<RecordEnvelope> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .post(self.records_url(collection))
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    /// Patches a record, presenting `transition_token` against the
    /// stored guard.
    pub async fn patch(
        &self,
        collection: &str,
        id: &str,
        namespace: &str,
        transition_token: &str,
        body: &RecordPatch,
    ) -> RecordResult<RecordEnvelope> {
        let token = self.bearer().await?;
        debug!("PATCH {collection}/{id} in namespace {namespace}");
        let resp = self
            .client
            .patch(self.record_url(collection, id))
            .bearer_auth(&token)
            .query(&[("namespace", namespace), ("token", transition_token)])
            .json(body)
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    /// Deletes a record, presenting `transition_token` against the
    /// stored guard.
    pub async fn delete(
        &self,
        collection: &str,
        id: &str,
        namespace: &str,
        transition_token: &str,
    ) -> RecordResult<()> {
        let token = self.bearer().await?;
        debug!("DELETE {collection}/{id} in namespace {namespace}");
        let resp = self
            .client
            .delete(self.record_url(collection, id))
            .bearer_auth(&token)
            .query(&[("namespace", namespace), ("token", transition_token)])
            .send()
            .await?;

        Self::check(resp)?;
        Ok(())
    }

    // ── Identity key material ──

    pub async fn fetch_identity(&self, user_id: &str) -> RecordResult<IdentityRecord> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .get(self.record_url(IDENTITY_COLLECTION, user_id))
            .bearer_auth(&token)
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    /// Persists the wrapped main secret and salt on the identity record.
    pub async fn save_identity_key(
        &self,
        user_id: &str,
        encrypted_key: &str,
        encryption_salt: &str,
    ) -> RecordResult<IdentityRecord> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .patch(self.record_url(IDENTITY_COLLECTION, user_id))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "encrypted_key": encrypted_key,
                "encryption_salt": encryption_salt,
            }))
            .send()
            .await?;

        Ok(Self::check(resp)?.json().await?)
    }

    /// Deletes the identity record. Only the account purge calls this,
    /// and only after every module's namespace verified empty.
    pub async fn delete_identity(&self, user_id: &str) -> RecordResult<()> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .delete(self.record_url(IDENTITY_COLLECTION, user_id))
            .bearer_auth(&token)
            .send()
            .await?;

        Self::check(resp)?;
        Ok(())
    }
}
