use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait};
use uuid::Uuid;

use crate::{
    LedgerChange, LedgerEntry, LedgerError, RecurrenceRule, RestoreAction, RestorePayload,
    RestoredOperation, ResultLedger, entry, recurring,
};

use super::{OfflineLedger, with_tx};

impl OfflineLedger {
    /// Deletes exactly one entry, returning a handle that replays it.
    pub(crate) async fn delete_entry(&self, entry: &LedgerEntry) -> ResultLedger<RestoreAction> {
        let id = entry.require_id()?;

        // Snapshot from storage, not from the caller's possibly stale copy.
        let model = entry::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("entry not exists".to_string()))?;
        let snapshot = LedgerEntry::try_from(model)?;

        entry::Entity::delete_by_id(id.to_string())
            .exec(&self.database)
            .await?;

        self.changes().publish(LedgerChange::EntryDeleted { id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteOne,
            RestorePayload::Entries(vec![snapshot]),
        ))
    }

    /// Deletes a rule and every entry it materialized.
    pub(crate) async fn delete_rule(&self, rule_id: Uuid) -> ResultLedger<RestoreAction> {
        let (rule, entries) = with_tx!(self, |db_tx| {
            let model = recurring::Entity::find_by_id(rule_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| LedgerError::KeyNotFound("rule not exists".to_string()))?;
            let rule = RecurrenceRule::try_from(model)?;

            let entries = Self::rule_entries(&db_tx, rule_id, None, None).await?;

            entry::Entity::delete_many()
                .filter(entry::Column::RuleId.eq(rule_id.to_string()))
                .exec(&db_tx)
                .await?;
            recurring::Entity::delete_by_id(rule_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok((rule, entries))
        })?;

        tracing::debug!(%rule_id, removed = entries.len(), "deleted rule");
        self.changes().publish(LedgerChange::RuleDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteAll,
            RestorePayload::RuleWithEntries { rule, entries },
        ))
    }

    /// Deletes the rule's entries strictly after `date`.
    pub(crate) async fn delete_rule_entries_after(
        &self,
        rule_id: Uuid,
        date: chrono::NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        let entries = with_tx!(self, |db_tx| {
            let entries = Self::rule_entries(&db_tx, rule_id, Some(date), None).await?;
            entry::Entity::delete_many()
                .filter(entry::Column::RuleId.eq(rule_id.to_string()))
                .filter(entry::Column::Date.gt(date))
                .exec(&db_tx)
                .await?;
            Ok(entries)
        })?;

        self.changes()
            .publish(LedgerChange::RuleEntriesDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteAfter,
            RestorePayload::Entries(entries),
        ))
    }

    /// Deletes the rule's entries strictly before `date`.
    ///
    /// Guarded: fails with `NoEarlierOccurrence` when the rule has nothing
    /// before the date, mutating nothing.
    pub(crate) async fn delete_rule_entries_before(
        &self,
        rule_id: Uuid,
        date: chrono::NaiveDate,
    ) -> ResultLedger<RestoreAction> {
        let entries = with_tx!(self, |db_tx| {
            let entries = Self::rule_entries(&db_tx, rule_id, None, Some(date)).await?;
            if entries.is_empty() {
                return Err(LedgerError::NoEarlierOccurrence(date.to_string()));
            }
            entry::Entity::delete_many()
                .filter(entry::Column::RuleId.eq(rule_id.to_string()))
                .filter(entry::Column::Date.lt(date))
                .exec(&db_tx)
                .await?;
            Ok(entries)
        })?;

        self.changes()
            .publish(LedgerChange::RuleEntriesDeleted { id: rule_id });
        Ok(RestoreAction::new(
            RestoredOperation::DeleteBefore,
            RestorePayload::Entries(entries),
        ))
    }

    /// True when at least one materialized entry predates `date`.
    pub(crate) async fn has_entries_before(
        &self,
        rule_id: Uuid,
        date: chrono::NaiveDate,
    ) -> ResultLedger<bool> {
        let count = entry::Entity::find()
            .filter(entry::Column::RuleId.eq(rule_id.to_string()))
            .filter(entry::Column::Date.lt(date))
            .count(&self.database)
            .await?;
        Ok(count > 0)
    }

    /// Replays a restore handle: re-inserts the captured rows, original ids
    /// included.
    ///
    /// A partially failed replay is not rolled back; the error surfaces and
    /// the rows inserted so far remain.
    pub(crate) async fn restore(&self, action: RestoreAction) -> ResultLedger<()> {
        match action.into_payload() {
            RestorePayload::Entries(entries) => {
                for entry in &entries {
                    entry::ActiveModel::try_from(entry)?
                        .insert(&self.database)
                        .await?;
                }
            }
            RestorePayload::RuleWithEntries { rule, entries } => {
                recurring::ActiveModel::try_from(&rule)?
                    .insert(&self.database)
                    .await?;
                for entry in &entries {
                    entry::ActiveModel::try_from(entry)?
                        .insert(&self.database)
                        .await?;
                }
            }
            RestorePayload::RuleSnapshot(_) => {
                return Err(LedgerError::InvalidRestore(
                    "rule snapshot replayed against the offline ledger".to_string(),
                ));
            }
        }

        self.changes().publish(LedgerChange::Restored);
        Ok(())
    }

    /// Snapshot of a rule's entries, optionally bounded (`after` exclusive,
    /// `before` exclusive).
    async fn rule_entries(
        db_tx: &sea_orm::DatabaseTransaction,
        rule_id: Uuid,
        after: Option<chrono::NaiveDate>,
        before: Option<chrono::NaiveDate>,
    ) -> ResultLedger<Vec<LedgerEntry>> {
        let mut query = entry::Entity::find()
            .filter(entry::Column::RuleId.eq(rule_id.to_string()))
            .order_by_asc(entry::Column::Date);
        if let Some(after) = after {
            query = query.filter(entry::Column::Date.gt(after));
        }
        if let Some(before) = before {
            query = query.filter(entry::Column::Date.lt(before));
        }

        let models = query.all(db_tx).await?;
        models
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultLedger<Vec<_>>>()
    }
}
