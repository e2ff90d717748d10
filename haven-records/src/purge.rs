//! Bulk purge: module disable and account deletion.
//!
//! Sweeps a namespace page by page, deletes every record (the sentinel
//! fallback covers never-promoted pendings), then re-lists the
//! namespace and requires zero remaining. The result is all-or-
//! nothing: any remainder fails the purge, and the account flow never
//! deletes the identity record past a failed module.

use crate::api_client::RecordApiClient;
use crate::error::{RecordError, RecordResult};
use crate::lifecycle::{DeleteOutcome, RecordLifecycle};
use crate::session::Session;
use crate::types::{ModuleHandle, LIST_SORT};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-id accounting from a namespace sweep. Deletes run sequentially,
/// so every failure attributes to exactly one id.
#[derive(Clone, Debug, Default)]
pub struct PurgeReport {
    pub namespace: String,
    /// Ids deleted with the derived guard.
    pub deleted: Vec<String>,
    /// Ids that needed the sentinel fallback (never-promoted records).
    pub fallback_deleted: Vec<String>,
    /// Ids whose delete failed on both paths.
    pub failed: Vec<String>,
}

/// Runs namespace and account purges.
pub struct PurgeRunner {
    api: Arc<RecordApiClient>,
    lifecycle: RecordLifecycle,
    page_size: u32,
}

impl PurgeRunner {
    /// Uses the client's configured page size.
    pub fn new(api: Arc<RecordApiClient>) -> Self {
        let page_size = api.config().page_size;
        Self::with_page_size(api, page_size)
    }

    pub fn with_page_size(api: Arc<RecordApiClient>, page_size: u32) -> Self {
        Self {
            lifecycle: RecordLifecycle::new(api.clone()),
            api,
            page_size,
        }
    }

    /// Purges every record in a module's namespace.
    ///
    /// The full id list is accumulated before any delete so paging is
    /// not disturbed by the deletes themselves. After the sweep the
    /// namespace is re-listed; the re-list is the authority — anything
    /// remaining fails the whole purge with `PurgeIncomplete`.
    pub async fn purge_module(
        &self,
        session: &Session,
        module: &ModuleHandle,
    ) -> RecordResult<PurgeReport> {
        let ids = self.collect_ids(module).await?;
        info!(
            "purging {} record(s) from namespace {}",
            ids.len(),
            module.namespace
        );

        let mut report = PurgeReport {
            namespace: module.namespace.clone(),
            ..Default::default()
        };
        for id in ids {
            match self.lifecycle.delete(session, module, &id).await {
                Ok(DeleteOutcome::Guarded) => report.deleted.push(id),
                Ok(DeleteOutcome::SentinelFallback) => report.fallback_deleted.push(id),
                Err(err) => {
                    warn!("purge delete failed for {id} in {}: {err}", module.namespace);
                    report.failed.push(id);
                }
            }
        }

        let remaining = self
            .api
            .list(&module.collection, &module.namespace, 1, self.page_size, LIST_SORT)
            .await?;
        if remaining.total_items > 0 {
            return Err(RecordError::PurgeIncomplete {
                namespace: module.namespace.clone(),
                remaining: remaining.total_items as usize,
            });
        }

        debug!("namespace {} verified empty", module.namespace);
        Ok(report)
    }

    /// Purges every module the user ever enabled, then deletes the
    /// identity record.
    ///
    /// The identity is removed only after every module's purge has
    /// independently verified an empty namespace; a single
    /// `PurgeIncomplete` aborts before the identity is touched.
    pub async fn purge_account(
        &self,
        session: &Session,
        modules: &[ModuleHandle],
        user_id: &str,
    ) -> RecordResult<Vec<PurgeReport>> {
        let mut reports = Vec::with_capacity(modules.len());
        for module in modules {
            reports.push(self.purge_module(session, module).await?);
        }

        self.api.delete_identity(user_id).await?;
        info!("account purge complete for identity {user_id}");
        Ok(reports)
    }

    /// Accumulates every id in the namespace, paging sequentially with
    /// the fixed page size and stable sort.
    async fn collect_ids(&self, module: &ModuleHandle) -> RecordResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page = 1u32;
        loop {
            let batch = self
                .api
                .list(&module.collection, &module.namespace, page, self.page_size, LIST_SORT)
                .await?;
            let fetched = batch.items.len();
            ids.extend(batch.items.into_iter().map(|r| r.id));

            if fetched < self.page_size as usize || ids.len() as u64 >= batch.total_items {
                break;
            }
            page += 1;
        }
        Ok(ids)
    }
}
