//! Contract the online engine consumes from its sync transport.
//!
//! The engine never talks to a concrete backend: it sees account-scoped rows
//! behind [`RemoteStore`]. Rules travel with their recurrence definition and
//! exception set as opaque JSON blobs; plain entries are value rows.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{LedgerEntry, Money, ResultLedger, recurrence::StoredRule, util::parse_uuid};

/// Sharing/partition key. Every remote row belongs to exactly one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub secret: String,
}

impl Account {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

/// Remote form of a recurring rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: String,
    pub title: String,
    pub amount_minor: i64,
    pub recurrence: String,
    pub exceptions: String,
}

impl RuleRow {
    pub(crate) fn from_stored(rule: &StoredRule) -> ResultLedger<Self> {
        Ok(Self {
            id: rule.id.to_string(),
            title: rule.title.clone(),
            amount_minor: rule.amount.minor_units(),
            recurrence: rule.definition_blob()?,
            exceptions: rule.exceptions_blob()?,
        })
    }

    pub(crate) fn into_stored(self) -> ResultLedger<StoredRule> {
        let id = parse_uuid(&self.id, "rule")?;
        StoredRule::parse_blobs(
            id,
            self.title,
            Money::new(self.amount_minor),
            &self.recurrence,
            &self.exceptions,
        )
    }
}

/// Remote form of a plain (non-recurring) entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: String,
    pub title: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub checked: bool,
}

impl EntryRow {
    pub(crate) fn from_entry(entry: &LedgerEntry) -> ResultLedger<Self> {
        Ok(Self {
            id: entry.require_id()?.to_string(),
            title: entry.title.clone(),
            amount_minor: entry.amount.minor_units(),
            date: entry.date,
            checked: entry.checked,
        })
    }

    pub(crate) fn into_entry(self) -> ResultLedger<LedgerEntry> {
        Ok(LedgerEntry {
            id: Some(parse_uuid(&self.id, "entry")?),
            title: self.title,
            amount: Money::new(self.amount_minor),
            date: self.date,
            checked: self.checked,
            recurrence: None,
        })
    }
}

/// Reactive remote row store: a watch/query primitive plus a first-sync
/// signal.
///
/// `fetch_rules` returns the watch query's current row set; implementations
/// are expected to keep it fresh underneath. All operations may suspend and
/// may fail; the engine compensates (snapshot rollback) when a write fails.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Resolves once the transport has completed its first sync, or fails
    /// after `timeout`.
    async fn wait_for_first_sync(&self, timeout: Duration) -> ResultLedger<()>;

    async fn fetch_rules(&self, account: &Account) -> ResultLedger<Vec<RuleRow>>;

    async fn upsert_rule(&self, account: &Account, row: RuleRow) -> ResultLedger<()>;

    async fn delete_rule(&self, account: &Account, rule_id: &str) -> ResultLedger<()>;

    /// Entry rows with `from <= date <= to`.
    async fn fetch_entries(
        &self,
        account: &Account,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultLedger<Vec<EntryRow>>;

    /// Entry rows with `date <= day`, for balance sums.
    async fn entries_until(&self, account: &Account, day: NaiveDate)
    -> ResultLedger<Vec<EntryRow>>;

    async fn upsert_entry(&self, account: &Account, row: EntryRow) -> ResultLedger<()>;

    async fn delete_entry(&self, account: &Account, entry_id: &str) -> ResultLedger<()>;
}
