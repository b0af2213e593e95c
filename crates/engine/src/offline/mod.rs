//! Offline engine: eager occurrence materialization over relational storage.
//!
//! Persisting a rule flattens its whole horizon into concrete `entries`
//! rows inside one transaction; reads never interpret the rule again, they
//! only see rows. Compound mutations (flatten, tail rewrite, cascading
//! delete) share the same transaction discipline so partial failure leaves
//! no orphans.

use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    ChangeHub, ChangeStream, Currency, LedgerEntry, LedgerStore, Money, RecurrenceRule,
    RestoreAction, ResultLedger, TailUpdate,
};

mod delete;
mod read;
mod write;

pub use read::EntriesPage;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultLedger<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The materializing ledger engine.
#[derive(Debug)]
pub struct OfflineLedger {
    database: DatabaseConnection,
    currency: Currency,
    changes: ChangeHub,
}

impl OfflineLedger {
    /// Return a builder for `OfflineLedger`.
    pub fn builder() -> OfflineLedgerBuilder {
        OfflineLedgerBuilder::default()
    }

    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub(crate) fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    pub(crate) fn changes(&self) -> &ChangeHub {
        &self.changes
    }
}

impl LedgerStore for OfflineLedger {
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

/// The builder for `OfflineLedger`.
#[derive(Default)]
pub struct OfflineLedgerBuilder {
    database: DatabaseConnection,
    currency: Currency,
}

impl OfflineLedgerBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> OfflineLedgerBuilder {
        self.database = db;
        self
    }

    /// Currency used when formatting amounts at the boundary.
    pub fn currency(mut self, currency: Currency) -> OfflineLedgerBuilder {
        self.currency = currency;
        self
    }

    /// Construct `OfflineLedger`.
    pub async fn build(self) -> ResultLedger<OfflineLedger> {
        Ok(OfflineLedger {
            database: self.database,
            currency: self.currency,
            changes: ChangeHub::new(),
        })
    }
}
