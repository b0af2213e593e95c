//! Readiness state machine for the online rule cache.
//!
//! The in-memory rule set is only safe to query once a load has completed.
//! `NotLoaded` and `Error` trigger a fresh load on next access; `Loading`
//! makes concurrent callers wait (bounded) for the in-flight load instead of
//! issuing a duplicate one. A load first waits for the transport's
//! first-sync signal, then issues the watch query.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, watch};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger, recurrence::StoredRule};

use super::transport::{Account, RemoteStore};

/// Bound on waiting for an in-flight load to settle.
pub(crate) const LOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on waiting for the transport's first sync.
pub(crate) const FIRST_SYNC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CacheStatus {
    NotLoaded,
    Loading,
    Loaded,
    Error(String),
}

/// Shared rule cache guarded by the readiness machine.
#[derive(Debug)]
pub(crate) struct RuleCache {
    status: watch::Sender<CacheStatus>,
    rules: Mutex<HashMap<Uuid, StoredRule>>,
}

/// Marks the load as failed if the claiming caller disappears mid-flight,
/// so waiters are not stuck on `Loading` forever.
struct LoadClaim<'a> {
    status: &'a watch::Sender<CacheStatus>,
    settled: bool,
}

impl<'a> LoadClaim<'a> {
    fn settle(mut self, status: CacheStatus) {
        self.settled = true;
        let _ = self.status.send(status);
    }
}

impl Drop for LoadClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self
                .status
                .send(CacheStatus::Error("load abandoned".to_string()));
        }
    }
}

impl RuleCache {
    pub(crate) fn new() -> Self {
        Self {
            status: watch::Sender::new(CacheStatus::NotLoaded),
            rules: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks (bounded) until the cache is `Loaded`, reloading when needed.
    ///
    /// Exactly one caller claims a pending load; the others wait for the
    /// transition. Timeout expiry surfaces as [`LedgerError::SyncTimeout`],
    /// a retryable failure.
    pub(crate) async fn ensure_loaded<R: RemoteStore>(
        &self,
        remote: &R,
        account: &Account,
    ) -> ResultLedger<()> {
        loop {
            let status = self.status.borrow().clone();
            match status {
                CacheStatus::Loaded => return Ok(()),
                CacheStatus::Loading => return self.wait_until_settled().await,
                CacheStatus::NotLoaded | CacheStatus::Error(_) => {
                    let claimed = self.status.send_if_modified(|status| {
                        if matches!(status, CacheStatus::NotLoaded | CacheStatus::Error(_)) {
                            *status = CacheStatus::Loading;
                            true
                        } else {
                            false
                        }
                    });
                    if claimed {
                        return self.load(remote, account).await;
                    }
                    // Lost the race; re-inspect the new status.
                }
            }
        }
    }

    async fn load<R: RemoteStore>(&self, remote: &R, account: &Account) -> ResultLedger<()> {
        let claim = LoadClaim {
            status: &self.status,
            settled: false,
        };

        let result: ResultLedger<HashMap<Uuid, StoredRule>> = async {
            remote.wait_for_first_sync(FIRST_SYNC_TIMEOUT).await?;
            let rows = remote.fetch_rules(account).await?;
            let mut rules = HashMap::with_capacity(rows.len());
            for row in rows {
                let rule = row.into_stored()?;
                rules.insert(rule.id, rule);
            }
            Ok(rules)
        }
        .await;

        match result {
            Ok(rules) => {
                let count = rules.len();
                *self.rules.lock().await = rules;
                claim.settle(CacheStatus::Loaded);
                tracing::debug!(count, "rule cache loaded");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "rule cache load failed");
                claim.settle(CacheStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn wait_until_settled(&self) -> ResultLedger<()> {
        let mut rx = self.status.subscribe();
        let wait = async {
            loop {
                let status = rx.borrow_and_update().clone();
                match status {
                    CacheStatus::Loaded => return Ok(()),
                    CacheStatus::Error(cause) => return Err(LedgerError::Remote(cause)),
                    CacheStatus::NotLoaded | CacheStatus::Loading => {}
                }
                if rx.changed().await.is_err() {
                    return Err(LedgerError::Remote("rule cache dropped".to_string()));
                }
            }
        };

        match tokio::time::timeout(LOAD_TIMEOUT, wait).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::SyncTimeout(format!(
                "rule cache not loaded within {LOAD_TIMEOUT:?}"
            ))),
        }
    }

    /// Locked access to the loaded rules. Callers must have passed
    /// [`ensure_loaded`] first.
    ///
    /// [`ensure_loaded`]: RuleCache::ensure_loaded
    pub(crate) async fn rules(&self) -> MutexGuard<'_, HashMap<Uuid, StoredRule>> {
        self.rules.lock().await
    }
}
