//! Shared fixtures: an in-memory `RemoteStore` fake with failure injection
//! and ledger constructors for both engines.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use chrono::NaiveDate;
use engine::{
    Account, EntryRow, IntervalType, LedgerError, Money, OfflineLedger, OnlineLedger,
    RecurrenceRule, RemoteStore, ResultLedger, RuleRow,
};
use migration::MigratorTrait;
use sea_orm::Database;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn rent_rule() -> RecurrenceRule {
    RecurrenceRule::new(
        "Rent",
        Money::new(-1000),
        date(2024, 1, 1),
        IntervalType::Monthly,
    )
}

pub async fn offline_ledger() -> OfflineLedger {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    OfflineLedger::builder().database(db).build().await.unwrap()
}

pub fn online_ledger() -> (OnlineLedger<FakeRemote>, FakeRemote) {
    let remote = FakeRemote::default();
    let ledger = OnlineLedger::builder(remote.clone(), Account::new("acct-1", "s3cret")).build();
    (ledger, remote)
}

/// In-memory remote row store with failure injection.
#[derive(Clone, Default)]
pub struct FakeRemote {
    pub inner: Arc<FakeRemoteInner>,
}

#[derive(Default)]
pub struct FakeRemoteInner {
    pub rules: Mutex<HashMap<String, RuleRow>>,
    pub entries: Mutex<HashMap<String, EntryRow>>,
    pub fail_writes: AtomicBool,
    pub hang_first_sync: AtomicBool,
    pub hang_fetch: AtomicBool,
    pub rule_fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn hang_first_sync(&self, hang: bool) {
        self.inner.hang_first_sync.store(hang, Ordering::SeqCst);
    }

    pub fn hang_fetch(&self, hang: bool) {
        self.inner.hang_fetch.store(hang, Ordering::SeqCst);
    }

    pub fn rule_fetches(&self) -> usize {
        self.inner.rule_fetches.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> ResultLedger<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Remote("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl RemoteStore for FakeRemote {
    async fn wait_for_first_sync(&self, timeout: Duration) -> ResultLedger<()> {
        if self.inner.hang_first_sync.load(Ordering::SeqCst) {
            tokio::time::sleep(timeout).await;
            return Err(LedgerError::SyncTimeout(
                "first sync never completed".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_rules(&self, _account: &Account) -> ResultLedger<Vec<RuleRow>> {
        if self.inner.hang_fetch.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.rule_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.rules.lock().unwrap().values().cloned().collect())
    }

    async fn upsert_rule(&self, _account: &Account, row: RuleRow) -> ResultLedger<()> {
        self.check_write()?;
        self.inner.rules.lock().unwrap().insert(row.id.clone(), row);
        Ok(())
    }

    async fn delete_rule(&self, _account: &Account, rule_id: &str) -> ResultLedger<()> {
        self.check_write()?;
        self.inner.rules.lock().unwrap().remove(rule_id);
        Ok(())
    }

    async fn fetch_entries(
        &self,
        _account: &Account,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<EntryRow>> {
        Ok(self
            .inner
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.date >= from && row.date <= to)
            .cloned()
            .collect())
    }

    async fn entries_until(
        &self,
        _account: &Account,
        day: NaiveDate,
    ) -> ResultLedger<Vec<EntryRow>> {
        Ok(self
            .inner
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.date <= day)
            .cloned()
            .collect())
    }

    async fn upsert_entry(&self, _account: &Account, row: EntryRow) -> ResultLedger<()> {
        self.check_write()?;
        self.inner
            .entries
            .lock()
            .unwrap()
            .insert(row.id.clone(), row);
        Ok(())
    }

    async fn delete_entry(&self, _account: &Account, entry_id: &str) -> ResultLedger<()> {
        self.check_write()?;
        self.inner.entries.lock().unwrap().remove(entry_id);
        Ok(())
    }
}
