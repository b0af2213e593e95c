//! Online engine: one stored rule plus sparse exceptions, evaluated lazily.
//!
//! Rules live once in a remote row store (scoped by [`Account`]) and are
//! cached in memory behind the readiness machine in [`state`]. Edits and
//! deletes never touch materialized rows: they mutate the exception set or
//! truncate the rule's effective range, snapshotting the prior serialized
//! state so a failed write rolls the cache back before the error propagates.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    ChangeHub, ChangeStream, Currency, LedgerEntry, LedgerStore, Money, RecurrenceRule,
    RestoreAction, ResultLedger, TailUpdate,
};

mod read;
mod state;
mod transport;
mod write;

pub use transport::{Account, EntryRow, RemoteStore, RuleRow};

use state::RuleCache;

/// The lazily evaluating ledger engine.
#[derive(Debug)]
pub struct OnlineLedger<R: RemoteStore> {
    remote: R,
    account: Account,
    currency: Currency,
    changes: ChangeHub,
    cache: RuleCache,
}

impl<R: RemoteStore> OnlineLedger<R> {
    /// Return a builder for `OnlineLedger`.
    pub fn builder(remote: R, account: Account) -> OnlineLedgerBuilder<R> {
        OnlineLedgerBuilder {
            remote,
            account,
            currency: Currency::default(),
        }
    }

    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub(crate) async fn ensure_loaded(&self) -> ResultLedger<()> {
        self.cache.ensure_loaded(&self.remote, &self.account).await
    }
}

impl<R: RemoteStore> LedgerStore for OnlineLedger<R> {
    async fn persist_entry(&self, entry: LedgerEntry) -> ResultLedger<LedgerEntry> {
        self.persist_entry(entry).await
    }

    async fn persist_rule(&self, rule: RecurrenceRule) -> ResultLedger<RecurrenceRule> {
        self.persist_rule(rule).await
    }

    async fn update_rule_after_date(&self, update: TailUpdate) -> ResultLedger<()> {
        self.update_rule_after_date(update).await
    }

    async fn delete_entry(&self, entry: &LedgerEntry) -> ResultLedger<RestoreAction> {
        self.delete_entry(entry).await
    }

    async fn delete_rule(&self, rule_id: Uuid) -> ResultLedger<RestoreAction> {
        self.delete_rule(rule_id).await
    }

    async fn delete_rule_entries_after(
        &self,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        self.delete_rule_entries_after(rule_id, date).await
    }

    async fn delete_rule_entries_before(
        &self,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        self.delete_rule_entries_before(rule_id, date).await
    }

    async fn has_entries_before(&self, rule_id: Uuid, date: NaiveDate) -> ResultLedger<bool> {
        self.has_entries_before(rule_id, date).await
    }

    async fn entries_for_day(&self, day: NaiveDate) -> ResultLedger<Vec<LedgerEntry>> {
        self.entries_for_day(day).await
    }

    async fn entries_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        self.entries_for_range(from, to).await
    }

    async fn balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.balance(day).await
    }

    async fn checked_balance(&self, day: NaiveDate) -> ResultLedger<Money> {
        self.checked_balance(day).await
    }

    async fn restore(&self, action: RestoreAction) -> ResultLedger<()> {
        self.restore(action).await
    }

    fn subscribe(&self) -> ChangeStream {
        self.changes.subscribe()
    }
}

/// The builder for `OnlineLedger`.
pub struct OnlineLedgerBuilder<R: RemoteStore> {
    remote: R,
    account: Account,
    currency: Currency,
}

impl<R: RemoteStore> OnlineLedgerBuilder<R> {
    /// Currency used when formatting amounts at the boundary.
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Construct `OnlineLedger`. The rule cache starts `NotLoaded`; the
    /// first operation that needs it triggers the load.
    pub fn build(self) -> OnlineLedger<R> {
        OnlineLedger {
            remote: self.remote,
            account: self.account,
            currency: self.currency,
            changes: ChangeHub::new(),
            cache: RuleCache::new(),
        }
    }
}
