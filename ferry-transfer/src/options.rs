//! Migration tuning

use ferry_core::config::TransferSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with paths that failed in an earlier run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Leave them alone
    #[default]
    SkipFailed,
    /// Attempt them again; a success moves them to the succeeded set
    RetryFailed,
}

/// When the index is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PersistPolicy {
    #[default]
    EveryFile,
    EveryFolder,
}

#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub retry_policy: RetryPolicy,
    pub persist: PersistPolicy,
    /// Transfers in flight at once, at least 1
    pub concurrency: usize,
    /// Per-file deadline; an expired transfer counts as failed
    pub call_timeout: Option<Duration>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            persist: PersistPolicy::default(),
            concurrency: 1,
            call_timeout: None,
        }
    }
}

impl TransferOptions {
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_persist(mut self, persist: PersistPolicy) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

impl From<&TransferSettings> for TransferOptions {
    fn from(settings: &TransferSettings) -> Self {
        Self {
            retry_policy: if settings.retry_failed {
                RetryPolicy::RetryFailed
            } else {
                RetryPolicy::SkipFailed
            },
            persist: if settings.persist_every_file {
                PersistPolicy::EveryFile
            } else {
                PersistPolicy::EveryFolder
            },
            concurrency: settings.concurrency.max(1),
            call_timeout: settings.call_timeout_secs.map(Duration::from_secs),
        }
    }
}
