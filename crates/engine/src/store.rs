//! The ledger contract.
//!
//! [`LedgerStore`] is the single abstract surface both engines implement:
//! the offline materializer over relational storage and the online
//! rule+exception evaluator over a remote row store. Collaborators hold a
//! store, never an engine; the engine equivalence property (§ tests) is
//! checked through this trait alone.

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use crate::{
    ChangeStream, LedgerEntry, MonthView, Money, RecurrenceRule, RestoreAction, ResultLedger,
    TailUpdate,
    aggregate::{LEEWAY_DAYS, build_month_view, first_of_month, last_of_month},
};

/// Queryable, mutable ledger of dated monetary entries.
///
/// Every operation may suspend (disk or network bound). Mutations emit a
/// change notification on success; destructive mutations return a
/// [`RestoreAction`] replaying the removed state.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    /// Inserts the entry (no id) or updates the persisted row (id present).
    async fn persist_entry(&self, entry: LedgerEntry) -> ResultLedger<LedgerEntry>;

    /// Persists a new recurring rule and makes its occurrences queryable.
    async fn persist_rule(&self, rule: RecurrenceRule) -> ResultLedger<RecurrenceRule>;

    /// Rewrites a rule's tail from the pivot date (inclusive) forward.
    async fn update_rule_after_date(&self, update: TailUpdate) -> ResultLedger<()>;

    /// Deletes exactly one entry.
    async fn delete_entry(&self, entry: &LedgerEntry) -> ResultLedger<RestoreAction>;

    /// Deletes a rule and every occurrence it generated.
    async fn delete_rule(&self, rule_id: Uuid) -> ResultLedger<RestoreAction>;

    /// Deletes the rule's occurrences strictly after `date`.
    async fn delete_rule_entries_after(
        &self,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> ResultLedger<RestoreAction>;

    /// Deletes the rule's occurrences strictly before `date`.
    ///
    /// Fails with `NoEarlierOccurrence` when none exist; callers check
    /// [`has_entries_before`] first.
    ///
    /// [`has_entries_before`]: LedgerStore::has_entries_before
    async fn delete_rule_entries_before(
        &self,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> ResultLedger<RestoreAction>;

    /// True when the rule has at least one occurrence strictly before `date`.
    async fn has_entries_before(&self, rule_id: Uuid, date: NaiveDate) -> ResultLedger<bool>;

    async fn entries_for_day(&self, day: NaiveDate) -> ResultLedger<Vec<LedgerEntry>>;

    /// Entries with `from <= date <= to`, ordered by `(date, title, id)`.
    async fn entries_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<LedgerEntry>>;

    /// Raw signed sum of every entry dated on or before `day`.
    ///
    /// Presentation layers may negate this ("money left to spend"); the
    /// core never does.
    async fn balance(&self, day: NaiveDate) -> ResultLedger<Money>;

    /// Like [`balance`], restricted to checked entries.
    ///
    /// [`balance`]: LedgerStore::balance
    async fn checked_balance(&self, day: NaiveDate) -> ResultLedger<Money>;

    /// Replays a restore handle; itself a mutation.
    async fn restore(&self, action: RestoreAction) -> ResultLedger<()>;

    /// Subscribes to change notifications emitted after every mutation.
    fn subscribe(&self) -> ChangeStream;

    /// The month containing `month`, plus [`LEEWAY_DAYS`] on both sides.
    ///
    /// One balance query seeds the walk; each day then folds its entries in
    /// with O(1) work.
    ///
    /// [`LEEWAY_DAYS`]: crate::aggregate::LEEWAY_DAYS
    async fn month_view(&self, month: NaiveDate) -> ResultLedger<MonthView> {
        let first = first_of_month(month);
        let start = first - Days::new(LEEWAY_DAYS);
        let end = last_of_month(month) + Days::new(LEEWAY_DAYS);
        let seed_day = start - Days::new(1);

        let seed_balance = self.balance(seed_day).await?;
        let seed_checked = self.checked_balance(seed_day).await?;
        let entries = self.entries_for_range(start, end).await?;
        Ok(build_month_view(
            first,
            start,
            end,
            entries,
            seed_balance,
            seed_checked,
        ))
    }
}
