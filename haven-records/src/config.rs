//! Record service configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the record service client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the record service (e.g., "https://records.haven.app").
    pub base_url: String,

    /// Request timeout in seconds, applied to every remote call.
    pub request_timeout_secs: u64,

    /// Fixed page size for list sweeps. Purge accounting depends on
    /// this staying constant for the duration of a sweep.
    pub page_size: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://records.haven.app".to_string(),
            request_timeout_secs: 30,
            page_size: 200,
        }
    }
}
